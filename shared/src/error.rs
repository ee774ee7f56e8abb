//! Error taxonomy: problems that only cost us one datagram (or one frame)
//! versus problems that end the process.

use thiserror::Error;

/// Bad input from the network. The receiver drops the affected data and
/// keeps going.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("truncated data: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("checksum mismatch: frame carries {carried:#010x}, computed {computed:#010x}")]
    Checksum { carried: u32, computed: u32 },

    #[error("unknown event type {event_type} in a {frame_len}-byte frame")]
    UnknownEventType { event_type: u8, frame_len: usize },

    #[error("malformed {kind} payload in a {frame_len}-byte frame")]
    MalformedPayload { kind: &'static str, frame_len: usize },

    #[error("invalid {kind} event: {reason}")]
    InvalidEvent {
        kind: &'static str,
        reason: &'static str,
    },

    #[error("invalid player name {0:?}")]
    InvalidName(String),

    #[error("invalid turn direction {0}")]
    InvalidDirection(u8),
}

impl ProtocolError {
    /// Once a frame's length or checksum cannot be trusted, neither can the
    /// position of anything after it in the same datagram.
    pub fn discards_rest(&self) -> bool {
        matches!(
            self,
            ProtocolError::Truncated { .. } | ProtocolError::Checksum { .. }
        )
    }

    /// Byte length of the offending frame when it is known to be intact.
    pub fn frame_len(&self) -> Option<usize> {
        match self {
            ProtocolError::UnknownEventType { frame_len, .. }
            | ProtocolError::MalformedPayload { frame_len, .. } => Some(*frame_len),
            _ => None,
        }
    }
}

/// Unrecoverable failures: reported on stderr, then the process exits.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding failed: {0}")]
    Encode(#[from] bincode::Error),

    #[error("partial write: sent {sent} of {expected} bytes")]
    PartialWrite { sent: usize, expected: usize },

    #[error("could not resolve address {0}")]
    Resolve(String),

    #[error("bridge connection closed")]
    BridgeClosed,

    #[error("task failed: {0}")]
    Task(String),
}
