//! Address book of everyone the server multicasts to
//!
//! Any host that sends a parseable datagram is recorded here, keyed by its
//! IP address and port. For each one the book keeps:
//! - The player name it is bound to, if any (spectators have none)
//! - The next event number it expects, which drives resending
//! - When it was last heard from, for timeout cleanup
//!
//! A player name is bound to at most one address at a time. When a name
//! shows up from a new address the old entry is dropped.

use log::info;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

/// Address book key. IPv6 scope and flow info are deliberately ignored so a
/// host is recognised regardless of how the socket reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerKey {
    pub ip: IpAddr,
    pub port: u16,
}

impl From<SocketAddr> for PeerKey {
    fn from(addr: SocketAddr) -> Self {
        Self {
            ip: addr.ip(),
            port: addr.port(),
        }
    }
}

/// How a datagram identifies its sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity<'a> {
    /// Empty player name.
    Spectator,
    /// Valid player name.
    Player(&'a str),
    /// Header parsed but the name did not validate. The sender's current
    /// binding is left as it is.
    Unverified,
}

/// A recorded peer
#[derive(Debug)]
pub struct Client {
    /// Where multicast datagrams are sent
    pub addr: SocketAddr,
    /// Player name bound to this address, absent for spectators
    pub player_name: Option<String>,
    /// Next event number the peer expects
    pub cursor: u32,
    /// Last time any parseable datagram arrived from this peer
    pub last_seen: Instant,
}

impl Client {
    pub fn new(addr: SocketAddr, now: Instant) -> Self {
        Self {
            addr,
            player_name: None,
            cursor: 0,
            last_seen: now,
        }
    }

    /// Returns true once the peer has been silent for longer than `timeout`
    pub fn is_timed_out(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) > timeout
    }
}

/// Tracks peers and the name bindings between them
pub struct ClientManager {
    clients: HashMap<PeerKey, Client>,
    /// Player name to the address currently speaking for it
    names: HashMap<String, PeerKey>,
    timeout: Duration,
}

impl ClientManager {
    /// Creates an empty book that forgets peers silent for `timeout`
    pub fn new(timeout: Duration) -> Self {
        Self {
            clients: HashMap::new(),
            names: HashMap::new(),
            timeout,
        }
    }

    /// Records a datagram from `addr`
    ///
    /// Creates the entry on first contact and refreshes its cursor and
    /// activity time. A player name moves its binding to `addr`, dropping
    /// whatever entry held it before. An empty name turns the peer into a
    /// spectator.
    pub fn touch(&mut self, addr: SocketAddr, identity: Identity<'_>, cursor: u32, now: Instant) {
        let key = PeerKey::from(addr);

        if let Identity::Player(name) = identity {
            if let Some(previous) = self.names.get(name).copied() {
                if previous != key {
                    if let Some(stale) = self.clients.remove(&previous) {
                        info!("Player {} moved from {} to {}", name, stale.addr, addr);
                    }
                }
            }
        }

        let client = self.clients.entry(key).or_insert_with(|| {
            info!("New peer {}", addr);
            Client::new(addr, now)
        });
        client.addr = addr;
        client.cursor = cursor;
        client.last_seen = now;

        let new_name = match identity {
            Identity::Unverified => return,
            Identity::Spectator => None,
            Identity::Player(name) => Some(name),
        };
        if client.player_name.as_deref() == new_name {
            return;
        }
        if let Some(old) = client.player_name.take() {
            if self.names.get(&old) == Some(&key) {
                self.names.remove(&old);
            }
        }
        if let Some(name) = new_name {
            client.player_name = Some(name.to_string());
            self.names.insert(name.to_string(), key);
        }
    }

    /// Drops a peer and its name binding. Returns false if it was unknown.
    pub fn remove_client(&mut self, addr: SocketAddr) -> bool {
        let key = PeerKey::from(addr);
        match self.clients.remove(&key) {
            Some(client) => {
                if let Some(name) = client.player_name {
                    if self.names.get(&name) == Some(&key) {
                        self.names.remove(&name);
                    }
                }
                true
            }
            None => false,
        }
    }

    /// Removes every peer silent for longer than the timeout
    ///
    /// Returns the removed addresses so the caller can log them.
    pub fn sweep_timeouts(&mut self, now: Instant) -> Vec<SocketAddr> {
        let timed_out: Vec<SocketAddr> = self
            .clients
            .values()
            .filter(|client| client.is_timed_out(now, self.timeout))
            .map(|client| client.addr)
            .collect();

        for addr in &timed_out {
            self.remove_client(*addr);
        }

        timed_out
    }

    /// Looks up the peer currently bound to `name`
    #[cfg(test)]
    pub fn find_client_by_name(&self, name: &str) -> Option<&Client> {
        self.names.get(name).and_then(|key| self.clients.get(key))
    }

    #[cfg(test)]
    pub fn get(&self, addr: SocketAddr) -> Option<&Client> {
        self.clients.get(&PeerKey::from(addr))
    }

    /// Number of peers bound to a player name
    pub fn named_count(&self) -> usize {
        self.names.len()
    }

    /// Every peer's address with the event number it expects next
    pub fn targets(&self) -> Vec<(SocketAddr, u32)> {
        self.clients
            .values()
            .map(|client| (client.addr, client.cursor))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
