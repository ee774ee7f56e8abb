//! # Trail Arena Server
//!
//! Authoritative server for the trail arena. It owns the only copy of the
//! game, turns it into an append-only event log and multicasts that log
//! over UDP to every host that has talked to it recently.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Positions, headings, collisions and eliminations are computed here and
//! nowhere else. Clients only ever see the resulting events.
//!
//! ### Address Book
//! Any host sending a well-formed datagram is recorded together with the
//! next event number it expects. Player names bind to one address at a
//! time; silent hosts are forgotten after two seconds.
//!
//! ### Cursor-Driven Resending
//! Every turn each host is sent the log from its own cursor onwards, so a
//! lost datagram is repaired by the next multicast without any explicit
//! acknowledgement traffic.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! The simulation engine: roster, trail, movement and the event log.
//!
//! ### Arena Module (`arena`)
//! Round lifecycle: lobby readiness, the running game and the wait for
//! players to receive the final event before a new lobby opens.
//!
//! ### Client Manager Module (`client_manager`)
//! The address book and its name bindings.
//!
//! ### Network Module (`network`)
//! Socket ownership, the receive and timeout tasks, and the main loop that
//! ticks the arena and multicasts.
//!
//! ### Config Module (`config`)
//! Command line options.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerArgs;
//! use server::network::Server;
//! use clap::Parser;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerArgs::parse().into_config();
//!     let mut server = Server::new(&config).await?;
//!
//!     // Runs until an unrecoverable socket error:
//!     // - Receives client datagrams and refreshes the address book
//!     // - Advances the game once per turn
//!     // - Multicasts the event log from each host's cursor
//!     // - Sweeps hosts that went silent
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod arena;
pub mod client_manager;
pub mod config;
pub mod game;
pub mod network;
