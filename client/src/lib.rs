//! # Trail Arena Client Library
//!
//! Client-side driver for the trail arena. The client never simulates the
//! game itself; it replays the server's event stream and hands every applied
//! event to a local display process over a line-based TCP bridge.
//!
//! ## Architecture Overview
//!
//! ### Stream Replay
//! Datagrams from the server carry a game id and a run of checksummed event
//! frames. The shared `StreamDecoder` applies them strictly in order and
//! drops anything it cannot use; lost events come back on a later multicast
//! because the server always resends from the client's cursor.
//!
//! ### Heartbeat
//! Every 30 ms the client sends its session id, current turn intent, the
//! next event number it expects and its player name. That one datagram is
//! input, keep-alive and acknowledgement at once, so it goes out whether or
//! not anything changed.
//!
//! ## Module Organization
//!
//! ### Bridge Module (`bridge`)
//! Event to text line translation and the display connection.
//!
//! ### Input Module (`input`)
//! Key tokens from the display and the intent they produce.
//!
//! ### Network Module (`network`)
//! The receive, display and heartbeat tasks.
//!
//! ### Config Module (`config`)
//! Command line options.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use clap::Parser;
//! use client::config::ClientConfig;
//! use client::network::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::parse();
//!     Client::new(&config).await?.run().await?;
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod config;
pub mod input;
pub mod network;
