//! # refsync engine
//!
//! Client-side synchronization core.
//!
//! This crate provides:
//! - [`NotificationChannel`]: a self-healing push connection that reports
//!   which libraries changed on the server
//! - [`MergeEngine`]: applies batches of remote item snapshots to the local
//!   graph in one transaction and reports conflicts
//! - Reader annotation creation
//!
//! ## Control flow
//!
//! ```text
//! NotificationChannel ──LibraryChanged──▶ orchestrator ──REST fetch──▶ ItemBatch
//!                                                                        │
//!                            conflicts ◀── MergeEngine ◀─────────────────┘
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod annotations;
mod channel;
mod config;
mod error;
mod merge;
mod transport;
mod ws;

pub use channel::{ChannelStatus, ConnectionState, LibraryChanged, NotificationChannel, Settled};
pub use config::{ChannelConfig, RetrySchedule, DEFAULT_STREAM_URL};
pub use error::{ChannelError, ChannelResult, MergeError, MergeResult};
pub use merge::{MergeEngine, MergeOptions, MergeOutcome};
pub use transport::{
    Connector, MockConnection, MockConnector, MockServer, Socket, SocketEvent, SocketEvents,
};
pub use ws::WebSocketConnector;

// Re-export the protocol and store crates for convenience.
pub use refsync_protocol;
pub use refsync_store;
