//! Library containers.

use crate::types::LibraryId;
use serde::{Deserialize, Serialize};

/// Kind of library container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LibraryKind {
    /// The signed-in user's own library.
    User,
    /// A shared group library.
    Group,
}

/// A library container that owns items, collections and tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    /// Library identifier.
    pub id: LibraryId,
    /// Kind of library.
    pub kind: LibraryKind,
    /// Display name (empty until metadata has been fetched).
    pub name: String,
    /// Last library version seen from the server.
    pub version: u64,
    /// Whether the container's metadata must be fetched again.
    pub outdated: bool,
}

impl Library {
    /// Creates a library container.
    ///
    /// Group containers created this way are marked outdated because only
    /// their id is known; the user library is always complete.
    pub fn new(id: LibraryId, kind: LibraryKind, name: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            version: 0,
            outdated: kind == LibraryKind::Group,
        }
    }

    /// Returns true for group libraries.
    #[must_use]
    pub fn is_group(&self) -> bool {
        self.kind == LibraryKind::Group
    }
}
