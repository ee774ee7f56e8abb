//! Turn intent driven by key tokens from the display bridge

use log::debug;
use shared::{ClientInput, TurnDirection};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const LEFT_KEY_DOWN: &str = "LEFT_KEY_DOWN";
pub const LEFT_KEY_UP: &str = "LEFT_KEY_UP";
pub const RIGHT_KEY_DOWN: &str = "RIGHT_KEY_DOWN";
pub const RIGHT_KEY_UP: &str = "RIGHT_KEY_UP";

/// Tracks held keys and turns them into the intent carried by every
/// heartbeat
pub struct InputManager {
    session_id: u64,
    player_name: String,
    direction: TurnDirection,

    // Keys currently held, so releasing one falls back to the other
    left_held: bool,
    right_held: bool,
}

impl InputManager {
    /// Creates a manager whose session id is the current time in
    /// microseconds
    pub fn new(player_name: &str) -> Self {
        let session_id = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::from_secs(0))
            .as_micros();
        Self::with_session(player_name, session_id.min(u64::MAX as u128) as u64)
    }

    pub fn with_session(player_name: &str, session_id: u64) -> Self {
        Self {
            session_id,
            player_name: player_name.to_string(),
            direction: TurnDirection::Straight,
            left_held: false,
            right_held: false,
        }
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn direction(&self) -> TurnDirection {
        self.direction
    }

    /// Applies one key token. Returns false for tokens it does not know.
    pub fn apply_token(&mut self, token: &str) -> bool {
        match token {
            LEFT_KEY_DOWN => {
                self.left_held = true;
                self.direction = TurnDirection::Left;
            }
            RIGHT_KEY_DOWN => {
                self.right_held = true;
                self.direction = TurnDirection::Right;
            }
            LEFT_KEY_UP => {
                self.left_held = false;
                self.direction = if self.right_held {
                    TurnDirection::Right
                } else {
                    TurnDirection::Straight
                };
            }
            RIGHT_KEY_UP => {
                self.right_held = false;
                self.direction = if self.left_held {
                    TurnDirection::Left
                } else {
                    TurnDirection::Straight
                };
            }
            _ => {
                debug!("Ignoring bridge token {:?}", token);
                return false;
            }
        }
        true
    }

    /// Applies every whitespace-separated token on a bridge line
    pub fn apply_line(&mut self, line: &str) {
        for token in line.split_whitespace() {
            self.apply_token(token);
        }
    }

    /// Builds the periodic input datagram for the given cursor
    pub fn heartbeat(&self, next_expected_event_no: u32) -> ClientInput {
        ClientInput {
            session_id: self.session_id,
            turn_direction: self.direction,
            next_expected_event_no,
            player_name: self.player_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_manager_creation() {
        let manager = InputManager::with_session("alice", 42);
        assert_eq!(manager.session_id(), 42);
        assert_eq!(manager.direction(), TurnDirection::Straight);
    }

    #[test]
    fn test_session_id_is_recent_microseconds() {
        let manager = InputManager::new("alice");
        // Later than 2020-01-01 expressed in microseconds.
        assert!(manager.session_id() > 1_577_836_800_000_000);
    }

    #[test]
    fn test_key_presses_set_direction() {
        let mut manager = InputManager::with_session("", 1);
        assert!(manager.apply_token(LEFT_KEY_DOWN));
        assert_eq!(manager.direction(), TurnDirection::Left);
        assert!(manager.apply_token(RIGHT_KEY_DOWN));
        assert_eq!(manager.direction(), TurnDirection::Right);
    }

    #[test]
    fn test_release_falls_back_to_other_held_key() {
        let mut manager = InputManager::with_session("", 1);
        manager.apply_token(LEFT_KEY_DOWN);
        manager.apply_token(RIGHT_KEY_DOWN);
        manager.apply_token(RIGHT_KEY_UP);
        assert_eq!(manager.direction(), TurnDirection::Left);
        manager.apply_token(LEFT_KEY_UP);
        assert_eq!(manager.direction(), TurnDirection::Straight);
    }

    #[test]
    fn test_release_without_other_key_goes_straight() {
        let mut manager = InputManager::with_session("", 1);
        manager.apply_token(RIGHT_KEY_DOWN);
        manager.apply_token(RIGHT_KEY_UP);
        assert_eq!(manager.direction(), TurnDirection::Straight);
    }

    #[test]
    fn test_unknown_tokens_are_ignored() {
        let mut manager = InputManager::with_session("", 1);
        manager.apply_token(LEFT_KEY_DOWN);
        assert!(!manager.apply_token("JUMP"));
        assert_eq!(manager.direction(), TurnDirection::Left);
    }

    #[test]
    fn test_apply_line_handles_several_tokens() {
        let mut manager = InputManager::with_session("", 1);
        manager.apply_line("LEFT_KEY_DOWN RIGHT_KEY_DOWN  LEFT_KEY_UP\r");
        assert_eq!(manager.direction(), TurnDirection::Right);
    }

    #[test]
    fn test_heartbeat_carries_state() {
        let mut manager = InputManager::with_session("bob", 9);
        manager.apply_token(LEFT_KEY_DOWN);
        let input = manager.heartbeat(17);
        assert_eq!(
            input,
            ClientInput {
                session_id: 9,
                turn_direction: TurnDirection::Left,
                next_expected_event_no: 17,
                player_name: "bob".to_string(),
            }
        );
    }
}
