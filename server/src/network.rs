//! Server network layer handling UDP communications and game loop coordination

use crate::arena::Arena;
use crate::client_manager::{ClientManager, Identity};
use crate::config::ServerConfig;
use log::{debug, error, info, warn};
use shared::codec::{decode_input, encode_frame, pack_datagrams, RawInput};
use shared::{is_valid_player_name, FatalError, CLIENT_TIMEOUT};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::time::{interval, MissedTickBehavior};

/// How often silent peers are swept from the address book.
const SWEEP_INTERVAL: Duration = Duration::from_millis(100);

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    ClientTimeout {
        addr: SocketAddr,
        /// Peers left in the address book after the sweep.
        remaining: usize,
    },
    Fatal(FatalError),
}

/// Encoded frames of the current round, kept so each tick only encodes the
/// events it added.
#[derive(Debug, Default)]
pub struct FrameCache {
    round: Option<u64>,
    game_id: u32,
    frames: Vec<Vec<u8>>,
}

impl FrameCache {
    pub fn sync(&mut self, arena: &Arena) -> Result<(), FatalError> {
        if self.round != Some(arena.round()) {
            self.round = Some(arena.round());
            self.frames.clear();
        }
        let game = arena.game();
        self.game_id = game.game_id();
        for event in &game.events()[self.frames.len()..] {
            self.frames.push(encode_frame(event)?);
        }
        Ok(())
    }

    pub fn game_id(&self) -> u32 {
        self.game_id
    }

    pub fn frames(&self) -> &[Vec<u8>] {
        &self.frames
    }
}

/// First frame to resend to a peer expecting `cursor`. A cursor at or past
/// the end still gets the last event.
pub fn resend_start(cursor: u32, stream_len: usize) -> Option<usize> {
    let last = stream_len.checked_sub(1)?;
    Some((cursor as usize).min(last))
}

/// How a parsed datagram's name field binds its sender.
fn identify<'a>(raw: &RawInput<'a>) -> Identity<'a> {
    match std::str::from_utf8(raw.name) {
        Ok("") => Identity::Spectator,
        Ok(name) if is_valid_player_name(name) => Identity::Player(name),
        _ => Identity::Unverified,
    }
}

/// Sends every frame from each peer's cursor on, packed into datagrams.
pub async fn multicast(
    socket: &UdpSocket,
    clients: &RwLock<ClientManager>,
    game_id: u32,
    frames: &[Vec<u8>],
) -> Result<usize, FatalError> {
    let targets = clients.read().await.targets();
    let mut sent_datagrams = 0;

    for (addr, cursor) in targets {
        let Some(start) = resend_start(cursor, frames.len()) else {
            continue;
        };
        for datagram in pack_datagrams(game_id, &frames[start..]) {
            let sent = socket.send_to(&datagram, addr).await?;
            if sent != datagram.len() {
                return Err(FatalError::PartialWrite {
                    sent,
                    expected: datagram.len(),
                });
            }
            sent_datagrams += 1;
        }
    }

    Ok(sent_datagrams)
}

/// Main server coordinating networking and game simulation
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    arena: Arc<Mutex<Arena>>,
    turn_duration: Duration,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    /// Binds the dual-stack wildcard address, falling back to IPv4 only
    /// when the host has no IPv6.
    pub async fn new(config: &ServerConfig) -> Result<Self, FatalError> {
        let v6 = format!("[::]:{}", config.port);
        match UdpSocket::bind(&v6).await {
            Ok(socket) => Ok(Self::with_socket(socket, config)),
            Err(e) => {
                warn!("Could not bind {} ({}), falling back to IPv4", v6, e);
                Self::bind(&format!("0.0.0.0:{}", config.port), config).await
            }
        }
    }

    pub async fn bind(addr: &str, config: &ServerConfig) -> Result<Self, FatalError> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self::with_socket(socket, config))
    }

    fn with_socket(socket: UdpSocket, config: &ServerConfig) -> Self {
        let (server_tx, server_rx) = mpsc::unbounded_channel();
        if let Ok(addr) = socket.local_addr() {
            info!("Server listening on {}", addr);
        }

        Server {
            socket: Arc::new(socket),
            clients: Arc::new(RwLock::new(ClientManager::new(CLIENT_TIMEOUT))),
            arena: Arc::new(Mutex::new(Arena::new(config.game, config.seed))),
            turn_duration: config.turn_duration(),
            server_tx,
            server_rx,
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr, FatalError> {
        Ok(self.socket.local_addr()?)
    }

    /// Spawns task that continuously listens for incoming datagrams
    ///
    /// Every parseable datagram refreshes the address book, even when its
    /// name or direction is invalid. Only valid ones reach the arena.
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let arena = Arc::clone(&self.arena);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                let (len, addr) = match socket.recv_from(&mut buffer).await {
                    Ok(received) => received,
                    Err(e) => {
                        let _ = server_tx.send(ServerMessage::Fatal(e.into()));
                        return;
                    }
                };

                let raw = match decode_input(&buffer[..len]) {
                    Ok(raw) => raw,
                    Err(e) => {
                        debug!("Ignoring datagram from {}: {}", addr, e);
                        continue;
                    }
                };

                let named_clients = {
                    let mut clients = clients.write().await;
                    clients.touch(addr, identify(&raw), raw.next_expected_event_no, Instant::now());
                    clients.named_count()
                };

                match raw.validate() {
                    Ok(input) => arena.lock().await.handle_input(&input, named_clients),
                    Err(e) => debug!("Input from {} not applied: {}", addr, e),
                }
            }
        });
    }

    /// Spawns task that runs one turn per tick and multicasts the stream
    ///
    /// The arena lock is released before any datagram is sent.
    fn spawn_ticker(&self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let arena = Arc::clone(&self.arena);
        let server_tx = self.server_tx.clone();
        let turn_duration = self.turn_duration;

        tokio::spawn(async move {
            let mut tick_interval = interval(turn_duration);
            tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut cache = FrameCache::default();

            loop {
                tick_interval.tick().await;

                let synced = {
                    let mut arena = arena.lock().await;
                    if !arena.tick() {
                        continue;
                    }
                    cache.sync(&arena)
                };

                let result = match synced {
                    Ok(()) => multicast(&socket, &clients, cache.game_id(), cache.frames()).await,
                    Err(e) => Err(e),
                };
                match result {
                    Ok(sent) => debug!(
                        "Game {}: {} events, {} datagrams sent",
                        cache.game_id(),
                        cache.frames().len(),
                        sent
                    ),
                    Err(e) => {
                        let _ = server_tx.send(ServerMessage::Fatal(e));
                        return;
                    }
                }
            }
        });
    }

    /// Spawns task that removes peers silent for too long
    fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = interval(SWEEP_INTERVAL);

            loop {
                interval.tick().await;

                let (timed_out, remaining) = {
                    let mut clients = clients.write().await;
                    if clients.is_empty() {
                        continue;
                    }
                    (clients.sweep_timeouts(Instant::now()), clients.len())
                };

                for addr in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { addr, remaining }) {
                        error!("Failed to send timeout message: {}", e);
                        return;
                    }
                }
            }
        });
    }

    /// Starts the receive, tick and sweep tasks and waits until one of them
    /// hits an unrecoverable error.
    pub async fn run(&mut self) -> Result<(), FatalError> {
        self.spawn_network_receiver();
        self.spawn_ticker();
        self.spawn_timeout_checker();

        info!("Server started successfully");

        while let Some(message) = self.server_rx.recv().await {
            match message {
                ServerMessage::ClientTimeout { addr, remaining } => {
                    info!("Peer {} timed out, {} peers remain", addr, remaining)
                }
                ServerMessage::Fatal(e) => {
                    error!("Server stopping: {}", e);
                    return Err(e);
                }
            }
        }

        info!("Server shutting down");
        Ok(())
    }
}
