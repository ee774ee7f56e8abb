//! Bit-exact wire format.
//!
//! Server to client, one datagram is `[u32 game_id][frame]...[frame]` where
//! every frame is
//!
//! ```text
//! [u32 len][u32 event_no][u8 type][payload][u32 crc32]
//! ```
//!
//! `len` counts `event_no`, `type` and the payload. The CRC covers every
//! frame byte before it, `len` included.
//!
//! Client to server, one datagram is
//! `[u64 session_id][u8 turn_direction][u32 next_expected_event_no][name]`.
//!
//! All integers are big-endian. Fixed-layout parts go through bincode with
//! big-endian, fixed-width options; the variable tails are raw bytes.

use crate::error::{FatalError, ProtocolError};
use crate::event::{Event, EventData, GAME_OVER, NEW_GAME, PIXEL, PLAYER_ELIMINATED};
use crate::{is_valid_player_name, TurnDirection, MAX_DATAGRAM_SIZE};
use bincode::Options;
use log::warn;
use serde::{Deserialize, Serialize};

pub const LEN_FIELD: usize = 4;
pub const CRC_FIELD: usize = 4;
pub const GAME_ID_FIELD: usize = 4;
/// `event_no` and `type`: the part of `len` every frame has.
pub const FRAME_HEAD: usize = 5;
pub const INPUT_HEADER_LEN: usize = 13;

const BOARD_LEN: usize = 8;
const PIXEL_LEN: usize = 9;

fn wire() -> impl Options {
    bincode::DefaultOptions::new()
        .with_big_endian()
        .with_fixint_encoding()
        .allow_trailing_bytes()
}

fn read_u32(bytes: &[u8]) -> Option<u32> {
    bytes.get(..4)?.try_into().ok().map(u32::from_be_bytes)
}

#[derive(Debug, Serialize, Deserialize)]
struct FrameHeader {
    len: u32,
    event_no: u32,
    event_type: u8,
}

#[derive(Debug, Serialize, Deserialize)]
struct Board {
    width: u32,
    height: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct PixelBody {
    player: u8,
    x: u32,
    y: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct InputHeader {
    session_id: u64,
    turn_direction: u8,
    next_expected_event_no: u32,
}

// ============================================================================
// Frames
// ============================================================================

pub fn encode_frame(event: &Event) -> Result<Vec<u8>, FatalError> {
    let payload = encode_payload(&event.data)?;
    let header = FrameHeader {
        len: (FRAME_HEAD + payload.len()) as u32,
        event_no: event.event_no,
        event_type: event.data.type_code(),
    };

    let mut frame = wire().serialize(&header)?;
    frame.extend_from_slice(&payload);
    let crc = crc32fast::hash(&frame);
    frame.extend_from_slice(&crc.to_be_bytes());
    Ok(frame)
}

fn encode_payload(data: &EventData) -> Result<Vec<u8>, FatalError> {
    let payload = match data {
        EventData::NewGame {
            width,
            height,
            players,
        } => {
            let mut out = wire().serialize(&Board {
                width: *width,
                height: *height,
            })?;
            for name in players {
                out.extend_from_slice(name.as_bytes());
                out.push(0);
            }
            if players.is_empty() {
                out.push(0);
            }
            out
        }
        EventData::Pixel { player, x, y } => wire().serialize(&PixelBody {
            player: *player,
            x: *x,
            y: *y,
        })?,
        EventData::PlayerEliminated { player } => vec![*player],
        EventData::GameOver => Vec::new(),
    };
    Ok(payload)
}

/// A frame decoded from the front of a byte slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub event: Event,
    /// Bytes the frame occupied, CRC included.
    pub len: usize,
}

/// Decodes the frame at the start of `bytes`. Trailing bytes are left alone.
pub fn decode_frame(bytes: &[u8]) -> Result<DecodedFrame, ProtocolError> {
    let declared = read_u32(bytes).ok_or(ProtocolError::Truncated {
        needed: LEN_FIELD,
        available: bytes.len(),
    })? as usize;

    let covered = LEN_FIELD.saturating_add(declared);
    let total = covered.saturating_add(CRC_FIELD);
    if bytes.len() < total {
        return Err(ProtocolError::Truncated {
            needed: total,
            available: bytes.len(),
        });
    }

    let carried = read_u32(&bytes[covered..]).ok_or(ProtocolError::Truncated {
        needed: total,
        available: bytes.len(),
    })?;
    let computed = crc32fast::hash(&bytes[..covered]);
    if carried != computed {
        return Err(ProtocolError::Checksum { carried, computed });
    }

    if declared < FRAME_HEAD {
        return Err(ProtocolError::MalformedPayload {
            kind: "frame header",
            frame_len: total,
        });
    }
    let header: FrameHeader = wire()
        .deserialize(&bytes[..LEN_FIELD + FRAME_HEAD])
        .map_err(|_| ProtocolError::MalformedPayload {
            kind: "frame header",
            frame_len: total,
        })?;

    let payload = &bytes[LEN_FIELD + FRAME_HEAD..covered];
    let data = decode_payload(header.event_type, payload, total)?;

    Ok(DecodedFrame {
        event: Event::new(header.event_no, data),
        len: total,
    })
}

fn decode_payload(event_type: u8, payload: &[u8], frame_len: usize) -> Result<EventData, ProtocolError> {
    let malformed = |kind| ProtocolError::MalformedPayload { kind, frame_len };

    match event_type {
        NEW_GAME => {
            if payload.len() <= BOARD_LEN || payload.last() != Some(&0) {
                return Err(malformed("new game"));
            }
            let board: Board = wire()
                .deserialize(&payload[..BOARD_LEN])
                .map_err(|_| malformed("new game"))?;

            let roster = &payload[BOARD_LEN..payload.len() - 1];
            let players = if roster.is_empty() {
                Vec::new()
            } else {
                roster
                    .split(|b| *b == 0)
                    .map(|name| String::from_utf8(name.to_vec()))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| malformed("new game"))?
            };

            Ok(EventData::NewGame {
                width: board.width,
                height: board.height,
                players,
            })
        }
        PIXEL => {
            if payload.len() != PIXEL_LEN {
                return Err(malformed("pixel"));
            }
            let body: PixelBody = wire().deserialize(payload).map_err(|_| malformed("pixel"))?;
            Ok(EventData::Pixel {
                player: body.player,
                x: body.x,
                y: body.y,
            })
        }
        PLAYER_ELIMINATED => match payload {
            [player] => Ok(EventData::PlayerEliminated { player: *player }),
            _ => Err(malformed("player eliminated")),
        },
        GAME_OVER if payload.is_empty() => Ok(EventData::GameOver),
        GAME_OVER => Err(malformed("game over")),
        other => Err(ProtocolError::UnknownEventType {
            event_type: other,
            frame_len,
        }),
    }
}

// ============================================================================
// Multicast datagrams
// ============================================================================

/// Packs consecutive frames behind a `game_id` prefix, as many per datagram
/// as fit in `MAX_DATAGRAM_SIZE`. A frame too big for any datagram travels
/// alone.
pub fn pack_datagrams<F: AsRef<[u8]>>(game_id: u32, frames: &[F]) -> Vec<Vec<u8>> {
    let prefix = game_id.to_be_bytes();
    let mut datagrams = Vec::new();
    let mut current = prefix.to_vec();

    for frame in frames {
        let frame = frame.as_ref();
        if current.len() > GAME_ID_FIELD && current.len() + frame.len() > MAX_DATAGRAM_SIZE {
            datagrams.push(std::mem::replace(&mut current, prefix.to_vec()));
        }
        if GAME_ID_FIELD + frame.len() > MAX_DATAGRAM_SIZE {
            warn!(
                "Frame of {} bytes exceeds the datagram limit, sending it alone",
                frame.len()
            );
        }
        current.extend_from_slice(frame);
    }

    if current.len() > GAME_ID_FIELD {
        datagrams.push(current);
    }
    datagrams
}

/// Splits a multicast datagram into its game id and the frame bytes.
pub fn split_game_id(datagram: &[u8]) -> Result<(u32, &[u8]), ProtocolError> {
    let game_id = read_u32(datagram).ok_or(ProtocolError::Truncated {
        needed: GAME_ID_FIELD,
        available: datagram.len(),
    })?;
    Ok((game_id, &datagram[GAME_ID_FIELD..]))
}

// ============================================================================
// Client input
// ============================================================================

/// One client heartbeat: identity, steering intent and delivery cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInput {
    pub session_id: u64,
    pub turn_direction: TurnDirection,
    pub next_expected_event_no: u32,
    /// Empty for spectators.
    pub player_name: String,
}

impl ClientInput {
    pub fn encode(&self) -> Result<Vec<u8>, FatalError> {
        let mut datagram = wire().serialize(&InputHeader {
            session_id: self.session_id,
            turn_direction: self.turn_direction.into(),
            next_expected_event_no: self.next_expected_event_no,
        })?;
        datagram.extend_from_slice(self.player_name.as_bytes());
        Ok(datagram)
    }
}

/// An input datagram whose header parsed but whose contents have not been
/// checked yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInput<'a> {
    pub session_id: u64,
    pub turn_direction: u8,
    pub next_expected_event_no: u32,
    pub name: &'a [u8],
}

impl RawInput<'_> {
    /// Applies the name predicate and the direction range.
    pub fn validate(&self) -> Result<ClientInput, ProtocolError> {
        let player_name = match std::str::from_utf8(self.name) {
            Ok("") => String::new(),
            Ok(name) if is_valid_player_name(name) => name.to_string(),
            _ => {
                return Err(ProtocolError::InvalidName(
                    String::from_utf8_lossy(self.name).into_owned(),
                ))
            }
        };

        Ok(ClientInput {
            session_id: self.session_id,
            turn_direction: TurnDirection::try_from(self.turn_direction)?,
            next_expected_event_no: self.next_expected_event_no,
            player_name,
        })
    }
}

pub fn decode_input(datagram: &[u8]) -> Result<RawInput<'_>, ProtocolError> {
    if datagram.len() < INPUT_HEADER_LEN {
        return Err(ProtocolError::Truncated {
            needed: INPUT_HEADER_LEN,
            available: datagram.len(),
        });
    }
    let header: InputHeader =
        wire()
            .deserialize(&datagram[..INPUT_HEADER_LEN])
            .map_err(|_| ProtocolError::Truncated {
                needed: INPUT_HEADER_LEN,
                available: datagram.len(),
            })?;

    Ok(RawInput {
        session_id: header.session_id,
        turn_direction: header.turn_direction,
        next_expected_event_no: header.next_expected_event_no,
        name: &datagram[INPUT_HEADER_LEN..],
    })
}
