//! Command line options for the server.

use crate::game::GameSettings;
use clap::Parser;
use shared::{
    DEFAULT_PORT, MAX_HEIGHT, MAX_TURNING_RATE, MAX_VELOCITY, MAX_WIDTH, MIN_HEIGHT,
    MIN_TURNING_RATE, MIN_VELOCITY, MIN_WIDTH,
};
use std::time::Duration;

/// `-h` selects the board height, so help is only available as `--help`.
#[derive(Parser, Debug)]
#[command(author, version, about = "Trail arena game server", disable_help_flag = true)]
pub struct ServerArgs {
    /// UDP port to listen on
    #[arg(
        short = 'p',
        long,
        default_value_t = DEFAULT_PORT,
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub port: u16,

    /// Seed for game ids and spawn positions, random when omitted
    #[arg(short = 's', long)]
    pub seed: Option<u32>,

    /// Degrees a turning player rotates per turn
    #[arg(
        short = 't',
        long = "turning-speed",
        default_value_t = 6,
        value_parser = clap::value_parser!(u32).range(MIN_TURNING_RATE as i64..=MAX_TURNING_RATE as i64)
    )]
    pub turning_rate: u32,

    /// Turns per second
    #[arg(
        short = 'v',
        long = "velocity",
        default_value_t = 50,
        value_parser = clap::value_parser!(u32).range(MIN_VELOCITY as i64..=MAX_VELOCITY as i64)
    )]
    pub velocity: u32,

    /// Board width in cells
    #[arg(
        short = 'w',
        long,
        default_value_t = 640,
        value_parser = clap::value_parser!(u32).range(MIN_WIDTH as i64..=MAX_WIDTH as i64)
    )]
    pub width: u32,

    /// Board height in cells
    #[arg(
        short = 'h',
        long,
        default_value_t = 480,
        value_parser = clap::value_parser!(u32).range(MIN_HEIGHT as i64..=MAX_HEIGHT as i64)
    )]
    pub height: u32,

    /// Print help
    #[arg(long, action = clap::ArgAction::Help)]
    pub help: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub seed: u32,
    pub velocity: u32,
    pub game: GameSettings,
}

impl ServerConfig {
    /// Wall-clock time between turns.
    pub fn turn_duration(&self) -> Duration {
        Duration::from_secs(1) / self.velocity.max(1)
    }
}

impl ServerArgs {
    pub fn into_config(self) -> ServerConfig {
        ServerConfig {
            port: self.port,
            seed: self.seed.unwrap_or_else(rand::random),
            velocity: self.velocity,
            game: GameSettings {
                width: self.width,
                height: self.height,
                turning_rate: self.turning_rate,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_err;

    fn parse(args: &[&str]) -> Result<ServerArgs, clap::Error> {
        ServerArgs::try_parse_from(std::iter::once("server").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]).unwrap().into_config();
        assert_eq!(config.port, 2021);
        assert_eq!(config.velocity, 50);
        assert_eq!(
            config.game,
            GameSettings {
                width: 640,
                height: 480,
                turning_rate: 6
            }
        );
        assert_eq!(config.turn_duration(), Duration::from_millis(20));
    }

    #[test]
    fn test_short_flags() {
        let config = parse(&["-p", "3000", "-s", "77", "-t", "90", "-v", "250", "-w", "16", "-h", "1440"])
            .unwrap()
            .into_config();
        assert_eq!(config.port, 3000);
        assert_eq!(config.seed, 77);
        assert_eq!(config.velocity, 250);
        assert_eq!(config.game.turning_rate, 90);
        assert_eq!(config.game.width, 16);
        assert_eq!(config.game.height, 1440);
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        assert_err!(parse(&["-w", "15"]));
        assert_err!(parse(&["-w", "1921"]));
        assert_err!(parse(&["-h", "1441"]));
        assert_err!(parse(&["-t", "0"]));
        assert_err!(parse(&["-t", "91"]));
        assert_err!(parse(&["-v", "251"]));
        assert_err!(parse(&["-p", "0"]));
        assert_err!(parse(&["-p", "65536"]));
        assert_err!(parse(&["-s", "-1"]));
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        assert_err!(parse(&["-x", "1"]));
    }
}
