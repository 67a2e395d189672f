//! # refsync protocol
//!
//! Wire and input types for refsync.
//!
//! This crate provides:
//! - Notification channel envelopes (`ClientMessage`, `ServerMessage`)
//! - Item snapshots as delivered by the REST layer (`ItemBatch`)
//! - Merge conflict reporting types
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod conflict;
mod error;
mod messages;
mod snapshot;

pub use conflict::{ConflictKind, MergeConflict};
pub use error::{ProtocolError, ProtocolResult};
pub use messages::{
    ClientMessage, EventKind, LibraryChange, ServerMessage, SubscriptionError, SubscriptionInfo,
};
pub use snapshot::{
    CreatorSnapshot, FieldSnapshot, ItemBatch, ItemSnapshot, LibraryRef, TagSnapshot,
    UserSnapshot,
};
