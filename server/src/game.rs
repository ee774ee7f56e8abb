//! Authoritative simulation of one round.
//!
//! The engine owns the roster, the trail and the event log. Every observable
//! change is appended to the log; clients rebuild the round from it.

use log::{debug, info};
use shared::{Event, EventData, Randomness, TurnDirection, MAX_PLAYERS};
use std::collections::{HashMap, HashSet};

/// Players spawn in the centre of the cell they are drawn into.
const CELL_CENTRE: f64 = 0.5;
const FULL_TURN: i32 = 360;

type Cell = (i64, i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameSettings {
    pub width: u32,
    pub height: u32,
    /// Degrees added to or removed from a heading per turn.
    pub turning_rate: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    Running,
    Concluded,
}

#[derive(Debug, Clone)]
pub struct Player {
    pub name: String,
    pub x: f64,
    pub y: f64,
    /// Degrees, always in `0..360`.
    pub heading: i32,
    pub alive: bool,
    pub direction: TurnDirection,
}

impl Player {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            x: 0.0,
            y: 0.0,
            heading: 0,
            alive: false,
            direction: TurnDirection::Straight,
        }
    }

    fn cell(&self) -> Cell {
        (self.x.floor() as i64, self.y.floor() as i64)
    }
}

#[derive(Debug)]
pub struct Game {
    settings: GameSettings,
    game_id: u32,
    phase: Phase,
    /// Sorted by name once the game starts; the index is the player id.
    players: Vec<Player>,
    ids: HashMap<String, usize>,
    trail: HashSet<Cell>,
    alive_count: usize,
    events: Vec<Event>,
}

impl Game {
    pub fn new(settings: GameSettings) -> Self {
        Self {
            settings,
            game_id: 0,
            phase: Phase::NotStarted,
            players: Vec::new(),
            ids: HashMap::new(),
            trail: HashSet::new(),
            alive_count: 0,
            events: Vec::new(),
        }
    }

    pub fn game_id(&self) -> u32 {
        self.game_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn alive_count(&self) -> usize {
        self.alive_count
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Number of the `GameOver` event once the round has concluded.
    pub fn final_event_no(&self) -> Option<u32> {
        match self.events.last() {
            Some(event) if event.is_game_over() => Some(event.event_no),
            _ => None,
        }
    }

    /// Joins `name` to the roster. Empty names, names already present, a
    /// full roster and a started game are all silently ignored.
    pub fn add_player(&mut self, name: &str) {
        if self.phase != Phase::NotStarted
            || name.is_empty()
            || self.players.len() >= MAX_PLAYERS
            || self.players.iter().any(|p| p.name == name)
        {
            return;
        }
        debug!("Player {} joined the roster", name);
        self.players.push(Player::new(name));
    }

    /// Assigns ids, draws spawn cells and headings, logs `NewGame` and plays
    /// the bootstrap turn.
    pub fn start<R: Randomness>(&mut self, rng: &mut R) {
        if self.phase != Phase::NotStarted {
            return;
        }

        self.game_id = rng.draw();
        self.players.sort_by(|a, b| a.name.cmp(&b.name));

        let width = self.settings.width.max(1);
        let height = self.settings.height.max(1);
        for (id, player) in self.players.iter_mut().enumerate() {
            player.x = CELL_CENTRE + f64::from(rng.draw() % width);
            player.y = CELL_CENTRE + f64::from(rng.draw() % height);
            player.heading = (rng.draw() % FULL_TURN as u32) as i32;
            player.alive = true;
            self.ids.insert(player.name.clone(), id);
        }
        self.alive_count = self.players.len();
        self.phase = Phase::Running;

        info!(
            "Game {} started on a {}x{} board with {} players",
            self.game_id,
            self.settings.width,
            self.settings.height,
            self.players.len()
        );

        self.emit(EventData::NewGame {
            width: self.settings.width,
            height: self.settings.height,
            players: self.players.iter().map(|p| p.name.clone()).collect(),
        });
        self.play_turn(true);
    }

    pub fn set_direction(&mut self, name: &str, direction: TurnDirection) {
        if let Some(&id) = self.ids.get(name) {
            let player = &mut self.players[id];
            if player.alive {
                player.direction = direction;
            }
        }
    }

    /// Moves every living player one step. Returns whether the round is
    /// over.
    pub fn advance_turn(&mut self) -> bool {
        if self.phase == Phase::Running {
            self.play_turn(false);
        }
        self.phase == Phase::Concluded
    }

    fn play_turn(&mut self, bootstrap: bool) {
        let turning_rate = self.settings.turning_rate as i32;

        for id in 0..self.players.len() {
            let player = &mut self.players[id];
            if !player.alive {
                continue;
            }

            let previous = player.cell();
            if !bootstrap {
                let radians = f64::from(player.heading).to_radians();
                player.x += radians.cos();
                player.y += radians.sin();
                player.heading = match player.direction {
                    TurnDirection::Left => player.heading - turning_rate,
                    TurnDirection::Right => player.heading + turning_rate,
                    TurnDirection::Straight => player.heading,
                }
                .rem_euclid(FULL_TURN);
            }

            let cell = player.cell();
            if !bootstrap && cell == previous {
                continue;
            }

            if self.trail.contains(&cell) || !self.on_board(cell) {
                self.players[id].alive = false;
                self.alive_count -= 1;
                self.emit(EventData::PlayerEliminated { player: id as u8 });
                if self.alive_count <= 1 {
                    self.conclude();
                    return;
                }
                continue;
            }

            self.emit(EventData::Pixel {
                player: id as u8,
                x: cell.0 as u32,
                y: cell.1 as u32,
            });
            self.trail.insert(cell);
        }

        if self.alive_count <= 1 {
            self.conclude();
        }
    }

    fn on_board(&self, (x, y): Cell) -> bool {
        (0..i64::from(self.settings.width)).contains(&x)
            && (0..i64::from(self.settings.height)).contains(&y)
    }

    fn conclude(&mut self) {
        self.emit(EventData::GameOver);
        self.phase = Phase::Concluded;
        info!(
            "Game {} concluded after {} events",
            self.game_id,
            self.events.len()
        );
    }

    fn emit(&mut self, data: EventData) {
        let event_no = self.events.len() as u32;
        debug!("Game {} event {}: {:?}", self.game_id, event_no, data);
        self.events.push(Event::new(event_no, data));
    }
}
