//! Receiver side of the event stream.
//!
//! Frames are applied strictly in log order. Nothing is buffered: a frame
//! that is not the next one expected is dropped, and the sender's
//! resend-from-cursor policy delivers it again later.

use crate::codec::{decode_frame, split_game_id};
use crate::error::ProtocolError;
use crate::event::{Event, EventData};
use crate::{
    is_valid_player_name, MAX_HEIGHT, MAX_PLAYERS, MAX_WIDTH, MIN_HEIGHT, MIN_WIDTH,
};
use log::{debug, info, warn};
use std::collections::VecDeque;

/// How many previously followed games are remembered and ignored.
const RETIRED_GAMES: usize = 4;

#[derive(Debug, Default)]
pub struct StreamDecoder {
    tracked_game_id: Option<u32>,
    /// Most recent games we followed earlier, oldest first; their
    /// stragglers are ignored.
    retired_game_ids: VecDeque<u32>,
    expected_cursor: u32,
    concluded: bool,
    width: u32,
    height: u32,
    roster: Vec<String>,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracked_game_id(&self) -> Option<u32> {
        self.tracked_game_id
    }

    /// Number of the next event this receiver will accept.
    pub fn expected_cursor(&self) -> u32 {
        self.expected_cursor
    }

    pub fn is_concluded(&self) -> bool {
        self.concluded
    }

    pub fn roster(&self) -> &[String] {
        &self.roster
    }

    pub fn player_name(&self, player: u8) -> Option<&str> {
        self.roster.get(usize::from(player)).map(String::as_str)
    }

    /// Runs one datagram through the decode contract and returns the events
    /// that were applied, in order.
    pub fn decode(&mut self, datagram: &[u8]) -> Vec<Event> {
        let (game_id, mut rest) = match split_game_id(datagram) {
            Ok(split) => split,
            Err(e) => {
                debug!("Dropping datagram: {}", e);
                return Vec::new();
            }
        };

        if self.tracked_game_id != Some(game_id) {
            if self.retired_game_ids.contains(&game_id) {
                debug!("Ignoring datagram from finished game {}", game_id);
                return Vec::new();
            }
            self.follow(game_id);
        }

        let mut applied = Vec::new();
        while !rest.is_empty() {
            let frame = match decode_frame(rest) {
                Ok(frame) => frame,
                Err(e) if e.discards_rest() => {
                    debug!("Discarding rest of datagram: {}", e);
                    break;
                }
                Err(e) => {
                    debug!("Skipping frame: {}", e);
                    match e.frame_len() {
                        Some(len) => {
                            rest = &rest[len..];
                            continue;
                        }
                        None => break,
                    }
                }
            };
            rest = &rest[frame.len..];

            if frame.event.event_no != self.expected_cursor {
                debug!(
                    "Skipping event {} while expecting {}",
                    frame.event.event_no, self.expected_cursor
                );
                continue;
            }
            if let Err(e) = self.check(&frame.event.data) {
                warn!("Skipping event {}: {}", frame.event.event_no, e);
                continue;
            }

            self.apply(&frame.event.data);
            self.expected_cursor += 1;
            applied.push(frame.event);
        }
        applied
    }

    fn follow(&mut self, game_id: u32) {
        if let Some(previous) = self.tracked_game_id.replace(game_id) {
            if self.retired_game_ids.len() == RETIRED_GAMES {
                self.retired_game_ids.pop_front();
            }
            self.retired_game_ids.push_back(previous);
        }
        info!("Following game {}", game_id);
        self.expected_cursor = 0;
        self.concluded = false;
        self.width = 0;
        self.height = 0;
        self.roster.clear();
    }

    fn check(&self, data: &EventData) -> Result<(), ProtocolError> {
        let invalid = |reason| {
            Err(ProtocolError::InvalidEvent {
                kind: data.kind(),
                reason,
            })
        };

        if self.concluded {
            return invalid("event after game over");
        }
        if (self.expected_cursor == 0) != matches!(data, EventData::NewGame { .. }) {
            return invalid("new game must open the stream");
        }

        match data {
            EventData::NewGame {
                width,
                height,
                players,
            } => {
                if !(MIN_WIDTH..=MAX_WIDTH).contains(width)
                    || !(MIN_HEIGHT..=MAX_HEIGHT).contains(height)
                {
                    return invalid("board size out of range");
                }
                if players.len() < 2 || players.len() > MAX_PLAYERS {
                    return invalid("wrong number of players");
                }
                if !players.iter().all(|name| is_valid_player_name(name)) {
                    return invalid("invalid player name");
                }
                if !players.windows(2).all(|pair| pair[0] < pair[1]) {
                    return invalid("players out of order");
                }
                Ok(())
            }
            EventData::Pixel { player, x, y } => {
                if self.player_name(*player).is_none() {
                    return invalid("unknown player");
                }
                if *x >= self.width || *y >= self.height {
                    return invalid("pixel outside the board");
                }
                Ok(())
            }
            EventData::PlayerEliminated { player } => match self.player_name(*player) {
                Some(_) => Ok(()),
                None => invalid("unknown player"),
            },
            EventData::GameOver => Ok(()),
        }
    }

    fn apply(&mut self, data: &EventData) {
        match data {
            EventData::NewGame {
                width,
                height,
                players,
            } => {
                self.width = *width;
                self.height = *height;
                self.roster = players.clone();
            }
            EventData::GameOver => {
                info!("Game {:?} is over", self.tracked_game_id);
                self.concluded = true;
            }
            EventData::Pixel { .. } | EventData::PlayerEliminated { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{encode_frame, pack_datagrams};

    fn new_game(event_no: u32) -> Event {
        Event::new(
            event_no,
            EventData::NewGame {
                width: 100,
                height: 80,
                players: vec!["ann".to_string(), "ben".to_string()],
            },
        )
    }

    fn pixel(event_no: u32, player: u8) -> Event {
        Event::new(event_no, EventData::Pixel { player, x: 3, y: 4 })
    }

    fn datagram(game_id: u32, events: &[Event]) -> Vec<u8> {
        let frames: Vec<Vec<u8>> = events.iter().map(|e| encode_frame(e).unwrap()).collect();
        let mut datagrams = pack_datagrams(game_id, &frames);
        assert_eq!(datagrams.len(), 1);
        datagrams.remove(0)
    }

    #[test]
    fn test_fresh_decoder() {
        let decoder = StreamDecoder::new();
        assert_eq!(decoder.tracked_game_id(), None);
        assert_eq!(decoder.expected_cursor(), 0);
        assert!(!decoder.is_concluded());
        assert!(decoder.roster().is_empty());
    }

    #[test]
    fn test_applies_in_order() {
        let mut decoder = StreamDecoder::new();
        let events = vec![new_game(0), pixel(1, 0), pixel(2, 1)];

        let applied = decoder.decode(&datagram(9, &events));
        assert_eq!(applied, events);
        assert_eq!(decoder.tracked_game_id(), Some(9));
        assert_eq!(decoder.expected_cursor(), 3);
        assert_eq!(decoder.player_name(1), Some("ben"));
    }

    #[test]
    fn test_duplicates_and_gaps_are_skipped() {
        let mut decoder = StreamDecoder::new();
        decoder.decode(&datagram(9, &[new_game(0), pixel(1, 0)]));

        // Event 1 again, then event 3 before 2.
        let applied = decoder.decode(&datagram(9, &[pixel(1, 0), pixel(3, 1), pixel(2, 1)]));
        assert_eq!(applied, vec![pixel(2, 1)]);
        assert_eq!(decoder.expected_cursor(), 3);
    }

    #[test]
    fn test_checksum_failure_discards_rest_of_datagram() {
        let mut decoder = StreamDecoder::new();
        let mut bytes = datagram(9, &[new_game(0), pixel(1, 0), pixel(2, 1)]);
        let first_frame_len = encode_frame(&new_game(0)).unwrap().len();
        // Corrupt the x coordinate of event 1.
        bytes[4 + first_frame_len + 12] ^= 0xff;

        let applied = decoder.decode(&bytes);
        assert_eq!(applied, vec![new_game(0)]);
        assert_eq!(decoder.expected_cursor(), 1);
    }

    #[test]
    fn test_new_game_id_resets_state() {
        let mut decoder = StreamDecoder::new();
        decoder.decode(&datagram(9, &[new_game(0), pixel(1, 0)]));
        assert_eq!(decoder.expected_cursor(), 2);

        // A later event of an unseen game resets, then waits for event 0.
        let applied = decoder.decode(&datagram(10, &[pixel(5, 0)]));
        assert!(applied.is_empty());
        assert_eq!(decoder.tracked_game_id(), Some(10));
        assert_eq!(decoder.expected_cursor(), 0);
        assert!(decoder.roster().is_empty());
    }

    #[test]
    fn test_retired_game_is_ignored() {
        let mut decoder = StreamDecoder::new();
        decoder.decode(&datagram(9, &[new_game(0)]));
        decoder.decode(&datagram(10, &[new_game(0)]));

        let applied = decoder.decode(&datagram(9, &[new_game(0), pixel(1, 0)]));
        assert!(applied.is_empty());
        assert_eq!(decoder.tracked_game_id(), Some(10));
        assert_eq!(decoder.expected_cursor(), 1);
    }

    #[test]
    fn test_retired_games_are_bounded() {
        let mut decoder = StreamDecoder::new();
        for game_id in 1..=(RETIRED_GAMES as u32 + 2) {
            decoder.decode(&datagram(game_id, &[new_game(0)]));
        }

        // The last few games stay ignored.
        let last_retired = RETIRED_GAMES as u32 + 1;
        assert!(decoder.decode(&datagram(last_retired, &[new_game(0)])).is_empty());

        // The oldest has been forgotten and can be followed again.
        let applied = decoder.decode(&datagram(1, &[new_game(0)]));
        assert_eq!(applied, vec![new_game(0)]);
        assert_eq!(decoder.tracked_game_id(), Some(1));
    }

    #[test]
    fn test_game_over_concludes() {
        let mut decoder = StreamDecoder::new();
        let events = vec![
            new_game(0),
            Event::new(1, EventData::PlayerEliminated { player: 1 }),
            Event::new(2, EventData::GameOver),
        ];
        decoder.decode(&datagram(4, &events));
        assert!(decoder.is_concluded());
        assert_eq!(decoder.expected_cursor(), 3);
    }

    #[test]
    fn test_semantically_invalid_events_do_not_advance() {
        let mut decoder = StreamDecoder::new();
        decoder.decode(&datagram(9, &[new_game(0)]));

        let unknown_player = Event::new(1, EventData::Pixel { player: 7, x: 0, y: 0 });
        let off_board = Event::new(1, EventData::Pixel { player: 0, x: 100, y: 0 });
        assert!(decoder.decode(&datagram(9, &[unknown_player, off_board])).is_empty());
        assert_eq!(decoder.expected_cursor(), 1);

        let mut fresh = StreamDecoder::new();
        let unsorted = Event::new(
            0,
            EventData::NewGame {
                width: 100,
                height: 80,
                players: vec!["zed".to_string(), "amy".to_string()],
            },
        );
        assert!(fresh.decode(&datagram(1, &[unsorted])).is_empty());
        assert_eq!(fresh.expected_cursor(), 0);
    }

    #[test]
    fn test_new_game_only_at_event_zero() {
        let mut decoder = StreamDecoder::new();
        let early_end = Event::new(0, EventData::GameOver);
        assert!(decoder.decode(&datagram(3, &[early_end])).is_empty());
        assert!(!decoder.is_concluded());

        decoder.decode(&datagram(3, &[new_game(0)]));
        assert!(decoder.decode(&datagram(3, &[new_game(1)])).is_empty());
        assert_eq!(decoder.expected_cursor(), 1);
    }

    #[test]
    fn test_nothing_follows_game_over() {
        let mut decoder = StreamDecoder::new();
        decoder.decode(&datagram(3, &[new_game(0), Event::new(1, EventData::GameOver)]));
        assert!(decoder.decode(&datagram(3, &[pixel(2, 0)])).is_empty());
        assert_eq!(decoder.expected_cursor(), 2);
    }

    #[test]
    fn test_short_datagram_is_dropped() {
        let mut decoder = StreamDecoder::new();
        assert!(decoder.decode(&[0, 1]).is_empty());
        assert_eq!(decoder.tracked_game_id(), None);
    }
}
