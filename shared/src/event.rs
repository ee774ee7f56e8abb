//! The append-only event log a round produces.

pub const NEW_GAME: u8 = 0;
pub const PIXEL: u8 = 1;
pub const PLAYER_ELIMINATED: u8 = 2;
pub const GAME_OVER: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventData {
    /// Board size and the roster in player id order.
    NewGame {
        width: u32,
        height: u32,
        players: Vec<String>,
    },
    Pixel {
        player: u8,
        x: u32,
        y: u32,
    },
    PlayerEliminated {
        player: u8,
    },
    GameOver,
}

impl EventData {
    pub fn type_code(&self) -> u8 {
        match self {
            EventData::NewGame { .. } => NEW_GAME,
            EventData::Pixel { .. } => PIXEL,
            EventData::PlayerEliminated { .. } => PLAYER_ELIMINATED,
            EventData::GameOver => GAME_OVER,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            EventData::NewGame { .. } => "new game",
            EventData::Pixel { .. } => "pixel",
            EventData::PlayerEliminated { .. } => "player eliminated",
            EventData::GameOver => "game over",
        }
    }
}

/// One entry of the log. `event_no` is the entry's position in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub event_no: u32,
    pub data: EventData,
}

impl Event {
    pub fn new(event_no: u32, data: EventData) -> Self {
        Self { event_no, data }
    }

    pub fn is_game_over(&self) -> bool {
        self.data == EventData::GameOver
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_codes() {
        let new_game = EventData::NewGame {
            width: 10,
            height: 10,
            players: vec![],
        };
        assert_eq!(new_game.type_code(), 0);
        assert_eq!(EventData::Pixel { player: 0, x: 1, y: 2 }.type_code(), 1);
        assert_eq!(EventData::PlayerEliminated { player: 3 }.type_code(), 2);
        assert_eq!(EventData::GameOver.type_code(), 3);
    }

    #[test]
    fn test_game_over_detection() {
        assert!(Event::new(9, EventData::GameOver).is_game_over());
        assert!(!Event::new(9, EventData::PlayerEliminated { player: 0 }).is_game_over());
    }
}
