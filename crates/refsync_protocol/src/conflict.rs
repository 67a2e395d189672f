//! Merge conflicts.

use crate::snapshot::ItemSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a snapshot was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictKind {
    /// The item was deleted locally and the deletion is not yet uploaded.
    DeletedLocally,
    /// The item has unsynced local edits.
    ChangedLocally,
}

impl ConflictKind {
    /// Returns the wire name of the conflict kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ConflictKind::DeletedLocally => "deleted-locally",
            ConflictKind::ChangedLocally => "changed-locally",
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A snapshot that was skipped, with the reason.
///
/// The caller decides how to resolve it, typically by asking the user and
/// merging again with remote data preferred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeConflict {
    /// The snapshot that was not applied.
    pub snapshot: ItemSnapshot,
    /// Why it was not applied.
    pub kind: ConflictKind,
}

impl MergeConflict {
    /// Creates a conflict record.
    pub fn new(snapshot: ItemSnapshot, kind: ConflictKind) -> Self {
        Self { snapshot, kind }
    }

    /// Key of the conflicting item.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.snapshot.key
    }
}
