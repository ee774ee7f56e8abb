//! Round lifecycle around the simulation engine.
//!
//! The arena moves through lobby, running and finishing stages and opens a
//! fresh lobby once enough players have caught up with the end of a round.
//! The sequence generator lives here so it carries over between rounds.

use crate::game::{Game, GameSettings};
use log::{debug, info};
use shared::{ClientInput, SequenceGenerator};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    /// Collecting players. Anyone who has pressed a turn key is ready.
    Lobby { ready: HashSet<String> },
    Running { finish_threshold: usize },
    /// Game over has been logged; waiting for players to receive it.
    Finishing {
        finish_threshold: usize,
        final_event_no: u32,
        finished: HashSet<String>,
    },
}

#[derive(Debug)]
pub struct Arena {
    settings: GameSettings,
    rng: SequenceGenerator,
    game: Game,
    stage: Stage,
    /// Incremented every time a fresh lobby opens.
    round: u64,
}

impl Arena {
    pub fn new(settings: GameSettings, seed: u32) -> Self {
        Self {
            settings,
            rng: SequenceGenerator::new(seed),
            game: Game::new(settings),
            stage: Stage::Lobby {
                ready: HashSet::new(),
            },
            round: 0,
        }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    /// Applies one validated datagram. `named_clients` is the number of
    /// addresses currently bound to a player name.
    pub fn handle_input(&mut self, input: &ClientInput, named_clients: usize) {
        let name = input.player_name.as_str();
        if name.is_empty() {
            return;
        }

        match &mut self.stage {
            Stage::Lobby { ready } => {
                self.game.add_player(name);
                if input.turn_direction.is_turning() && ready.insert(name.to_string()) {
                    info!("Player {} is ready ({}/{})", name, ready.len(), named_clients);
                }
                if ready.len() >= named_clients.max(2) {
                    self.start_game(named_clients);
                }
            }
            Stage::Running { .. } => {
                self.game.set_direction(name, input.turn_direction);
            }
            Stage::Finishing {
                finish_threshold,
                final_event_no,
                finished,
            } => {
                if input.next_expected_event_no > *final_event_no
                    && finished.insert(name.to_string())
                {
                    debug!("Player {} received the end of the round", name);
                }
                if finished.len() >= *finish_threshold {
                    self.open_lobby();
                }
            }
        }
    }

    /// Runs one turn if a game is in progress. Returns whether the event
    /// stream should be multicast.
    pub fn tick(&mut self) -> bool {
        match self.stage {
            Stage::Lobby { .. } => false,
            Stage::Running { finish_threshold } => {
                if self.game.advance_turn() {
                    let final_event_no = self.game.final_event_no().unwrap_or_default();
                    self.stage = Stage::Finishing {
                        finish_threshold,
                        final_event_no,
                        finished: HashSet::new(),
                    };
                }
                true
            }
            Stage::Finishing { .. } => true,
        }
    }

    fn start_game(&mut self, named_clients: usize) {
        self.game.start(&mut self.rng);
        self.stage = Stage::Running {
            finish_threshold: named_clients,
        };
    }

    fn open_lobby(&mut self) {
        info!("Round {} finished, opening a new lobby", self.round);
        self.game = Game::new(self.settings);
        self.stage = Stage::Lobby {
            ready: HashSet::new(),
        };
        self.round += 1;
    }
}
