//! Collections (folders) that group items.

use crate::model::SyncState;
use crate::types::{EntityKey, LibraryId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A collection of items, optionally nested under a parent collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    /// Collection key, unique within the library.
    pub key: String,
    /// Owning library.
    pub library: LibraryId,
    /// Display name.
    pub name: String,
    /// Parent collection key.
    pub parent: Option<String>,
    /// Keys of member items (reverse of `Item::collections`).
    pub items: BTreeSet<String>,
    /// Remote sync state.
    pub sync_state: SyncState,
    /// Whether the collection has unsynced local edits.
    pub changed: bool,
    /// Whether the collection is locally deleted.
    pub deleted: bool,
}

impl Collection {
    /// Creates an empty, synced collection.
    pub fn new(library: LibraryId, key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            library,
            name: name.into(),
            parent: None,
            items: BTreeSet::new(),
            sync_state: SyncState::Synced,
            changed: false,
            deleted: false,
        }
    }

    /// Creates a placeholder for a collection that is referenced before it
    /// has been fetched.
    pub fn placeholder(library: LibraryId, key: impl Into<String>) -> Self {
        Self {
            sync_state: SyncState::Dirty,
            ..Self::new(library, key, "")
        }
    }

    /// Returns the stable address of this collection.
    #[must_use]
    pub fn entity_key(&self) -> EntityKey {
        EntityKey::new(self.library.clone(), self.key.clone())
    }
}
