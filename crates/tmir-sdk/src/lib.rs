//! TableMirror SDK - live table mirroring over a reconnecting socket
//!
//! This SDK keeps a local copy of a card table in sync with a game server.
//! Frames arrive over a WebSocket that reconnects on its own, are decoded
//! and logged by the dispatcher, and are merged into the table by the
//! reconciler from `tmir-state`.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use tmir_sdk::{ClientConfig, TableClient};
//!
//! #[tokio::main]
//! async fn main() -> tmir_sdk::Result<()> {
//!     let config = ClientConfig::builder()
//!         .ws_url("ws://localhost:8080/ws/room-1")
//!         .build();
//!     let client = TableClient::new(config);
//!     client.connect(None).await?;
//!
//!     let table = client.table();
//!     println!("{} players seated", table.players.len());
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`transport`] - Reconnecting connection task and the [`Connector`] seam
//! - [`ws`] / [`memory`] - WebSocket and in-memory connectors
//! - [`dispatcher`] - Decode, log, reconcile, notify
//! - [`log`] - Bounded human-readable message log
//! - [`client`] - [`TableClient`], one per room
//! - [`config`] - Client configuration
//! - [`error`] - Error types

pub mod backoff;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod log;
pub mod memory;
pub mod telemetry;
pub mod transport;
pub mod ws;

// Re-exports for convenience
pub use backoff::{Backoff, BackoffPolicy};
pub use client::TableClient;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use dispatcher::{DispatchStats, Dispatcher, Inbound, Observer};
pub use error::{Result, SdkError, TransportError};
pub use log::MessageLog;
pub use memory::{ConnectOutcome, MemoryConnector, MemoryPeer};
pub use telemetry::init_tracing;
pub use transport::{
    Connection, ConnectionState, Connector, Transport, TransportEvent, TransportHandle,
};
pub use ws::WsConnector;

// Re-export the state types callers read.
pub use tmir_core::{CardToken, Phase, Position, Suit, Team, TeamTally};
pub use tmir_state::{Diagnostics, MessageKind, TableEvent, TableState, TrickPlay};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::client::TableClient;
    pub use crate::config::ClientConfig;
    pub use crate::dispatcher::{Inbound, Observer};
    pub use crate::error::SdkError;
    pub use crate::transport::{Connector, TransportEvent};
    pub use tmir_state::{TableEvent, TableState};
}
