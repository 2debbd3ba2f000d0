//! Foldmon Client - monitor a Folding@Home client over its command port
//!
//! The client's command port (36330 by default) speaks a line-oriented text
//! protocol. Commands go out as single lines; answers come back as PyON
//! frames (see `foldmon-pyon`). This crate:
//!
//! - owns the TCP connection and polls it on a fixed interval ([`Connection`])
//! - extracts complete frames from the receive buffer
//! - keeps the newest message per key, folding the log stream into one
//!   entry ([`MessageCache`])
//! - projects known keys onto typed records ([`MessageRegistry`])
//! - reports everything as [`ClientEvent`]s on a broadcast channel
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use foldmon_client::{ClientConfig, ClientEvent, FahClient};
//!
//! # async fn run() -> foldmon_client::Result<()> {
//! let client = FahClient::new(ClientConfig::default());
//! let mut events = client.subscribe();
//!
//! client.connect("127.0.0.1", 36330, "").await?;
//! client.subscribe_updates(Duration::from_secs(5)).await?;
//!
//! while let Ok(event) = events.recv().await {
//!     if let ClientEvent::MessagesUpdated { keys } = event {
//!         println!("updated: {:?}", keys);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod command;
pub mod config;
pub mod connection;
mod decode;
pub mod error;
pub mod events;
pub mod message;
pub mod models;
pub mod reconnect;
pub mod registry;
pub mod resource;

pub use cache::MessageCache;
pub use client::FahClient;
pub use command::{Command, LogUpdates};
pub use config::ClientConfig;
pub use connection::{Connection, ConnectionInfo, ConnectionState, PollOutcome, ReceiveHandler};
pub use error::{Error, Result};
pub use events::{ClientEvent, MessageEvent, StatusLevel, StatusMessage};
pub use message::Message;
pub use reconnect::ReconnectPolicy;
pub use registry::{MessageRegistry, TypedMessage};
pub use resource::{Guarded, Published};

/// Default command port of a Folding@Home client.
pub const DEFAULT_PORT: u16 = 36330;
