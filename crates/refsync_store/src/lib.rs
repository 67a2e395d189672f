//! # refsync store
//!
//! Local object graph for refsync.
//!
//! This crate provides:
//! - The entity model (libraries, items, collections, tags, users)
//! - A key-addressed arena with symmetric relationship helpers
//! - Copy-on-write write transactions with optional JSON persistence
//! - The item type schema and derived display attributes
//! - Queries with explicit options

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod config;
pub mod display;
mod error;
mod graph;
mod keygen;
pub mod model;
pub mod query;
pub mod schema;
mod store;
mod transaction;
mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use graph::Graph;
pub use keygen::{generate_key, is_valid_key, KEY_ALPHABET, KEY_LENGTH};
pub use query::QueryOptions;
pub use schema::Schema;
pub use store::Store;
pub use transaction::Transaction;
pub use types::{EntityKey, LibraryId, SequenceNumber, TagKey, TransactionId};
