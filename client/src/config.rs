//! Command line options for the client.

use clap::Parser;
use shared::{is_valid_player_name, DEFAULT_BRIDGE_PORT, DEFAULT_PORT};

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(author, version, about = "Trail arena client bridging a local display to a game server")]
pub struct ClientConfig {
    /// Game server host name or address
    pub game_server: String,

    /// Player name, empty to spectate
    #[arg(short = 'n', long, default_value = "", value_parser = parse_player_name)]
    pub player_name: String,

    /// Game server UDP port
    #[arg(
        short = 'p',
        long,
        default_value_t = DEFAULT_PORT,
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub port: u16,

    /// Display bridge host
    #[arg(short = 'i', long, default_value = "localhost")]
    pub gui_server: String,

    /// Display bridge TCP port
    #[arg(
        short = 'r',
        long,
        default_value_t = DEFAULT_BRIDGE_PORT,
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub gui_port: u16,
}

fn parse_player_name(name: &str) -> Result<String, String> {
    if name.is_empty() || is_valid_player_name(name) {
        Ok(name.to_string())
    } else {
        Err(format!(
            "'{}' is not a valid name (1-20 printable ASCII characters, no spaces)",
            name
        ))
    }
}
