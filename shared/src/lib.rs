//! Wire protocol, event model and deterministic helpers shared by the arena
//! server and its clients.

pub mod codec;
pub mod decoder;
pub mod error;
pub mod event;
pub mod rng;

pub use codec::{ClientInput, DecodedFrame};
pub use decoder::StreamDecoder;
pub use error::{FatalError, ProtocolError};
pub use event::{Event, EventData};
pub use rng::{Randomness, SequenceGenerator};

use std::time::Duration;

pub const MAX_PLAYERS: usize = 25;
pub const MAX_NAME_LEN: usize = 20;
pub const MAX_DATAGRAM_SIZE: usize = 550;

pub const MIN_WIDTH: u32 = 16;
pub const MAX_WIDTH: u32 = 1920;
pub const MIN_HEIGHT: u32 = 16;
pub const MAX_HEIGHT: u32 = 1440;
pub const MIN_TURNING_RATE: u32 = 1;
pub const MAX_TURNING_RATE: u32 = 90;
pub const MIN_VELOCITY: u32 = 1;
pub const MAX_VELOCITY: u32 = 250;

pub const DEFAULT_PORT: u16 = 2021;
pub const DEFAULT_BRIDGE_PORT: u16 = 20210;

pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(2);
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(30);

/// Steering intent carried in every client input datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnDirection {
    #[default]
    Straight,
    Right,
    Left,
}

impl TurnDirection {
    pub fn is_turning(self) -> bool {
        self != TurnDirection::Straight
    }
}

impl TryFrom<u8> for TurnDirection {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TurnDirection::Straight),
            1 => Ok(TurnDirection::Right),
            2 => Ok(TurnDirection::Left),
            other => Err(ProtocolError::InvalidDirection(other)),
        }
    }
}

impl From<TurnDirection> for u8 {
    fn from(direction: TurnDirection) -> u8 {
        match direction {
            TurnDirection::Straight => 0,
            TurnDirection::Right => 1,
            TurnDirection::Left => 2,
        }
    }
}

/// Display names are 1 to 20 printable ASCII characters without spaces.
/// An empty name is not a name at all: its sender is a spectator.
pub fn is_valid_player_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name.bytes().all(|b| (33..=126).contains(&b))
}
