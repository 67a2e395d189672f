//! # refsync testkit
//!
//! Test utilities for refsync.
//!
//! This crate provides:
//! - Store fixtures with automatic cleanup
//! - Builders for item snapshots and batches
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use refsync_testkit::prelude::*;
//!
//! #[test]
//! fn merges_a_book() {
//!     let store = TestStore::memory();
//!     let batch = BatchBuilder::user("u1")
//!         .item(SnapshotBuilder::new("ABCD2345", "book").field("title", "Optics"))
//!         .build();
//!     // ... merge and assert
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod builders;
pub mod fixtures;
pub mod generators;

pub use refsync_store::{Clock, FixedClock};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::builders::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use refsync_store::{Clock, FixedClock};
}

pub use builders::*;
pub use fixtures::*;
pub use generators::*;
