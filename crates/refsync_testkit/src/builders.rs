//! Builders for item snapshots and batches.

use crate::fixtures::TEST_LIBRARY;
use refsync_protocol::{
    CreatorSnapshot, FieldSnapshot, ItemBatch, ItemSnapshot, LibraryRef, TagSnapshot,
    UserSnapshot,
};
use refsync_store::model::TagType;

/// Builds an [`ItemSnapshot`]. The library is filled in by [`BatchBuilder`].
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    snapshot: ItemSnapshot,
}

impl SnapshotBuilder {
    /// Starts a snapshot at version 1 in the default test library.
    pub fn new(key: &str, item_type: &str) -> Self {
        Self {
            snapshot: ItemSnapshot::new(LibraryRef::user(TEST_LIBRARY), key, 1, item_type),
        }
    }

    /// Sets the version.
    pub fn version(mut self, version: u64) -> Self {
        self.snapshot.version = version;
        self
    }

    /// Appends a field.
    pub fn field(mut self, key: &str, value: &str) -> Self {
        self.snapshot.fields.push(FieldSnapshot {
            key: key.to_string(),
            value: value.to_string(),
        });
        self
    }

    /// Appends a two-field creator.
    pub fn creator(mut self, creator_type: &str, first_name: &str, last_name: &str) -> Self {
        self.snapshot.creators.push(CreatorSnapshot {
            creator_type: creator_type.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            name: String::new(),
        });
        self
    }

    /// Appends a manual tag.
    pub fn tag(self, name: &str) -> Self {
        self.typed_tag(name, TagType::Manual)
    }

    /// Appends a tag of the given type.
    pub fn typed_tag(mut self, name: &str, tag_type: TagType) -> Self {
        self.snapshot.tags.push(TagSnapshot {
            name: name.to_string(),
            tag_type,
        });
        self
    }

    /// Adds the item to a collection.
    pub fn collection(mut self, key: &str) -> Self {
        self.snapshot.collection_keys.push(key.to_string());
        self
    }

    /// Sets the parent item.
    pub fn parent(mut self, key: &str) -> Self {
        self.snapshot.parent_key = Some(key.to_string());
        self
    }

    /// Moves the item to the trash.
    pub fn trashed(mut self) -> Self {
        self.snapshot.trash = true;
        self
    }

    /// Sets a relation.
    pub fn relation(mut self, predicate: &str, value: &str) -> Self {
        self.snapshot
            .relations
            .insert(predicate.to_string(), value.to_string());
        self
    }

    /// Sets the creating user.
    pub fn created_by(mut self, id: u64, username: &str) -> Self {
        self.snapshot.created_by = Some(UserSnapshot {
            id,
            username: username.to_string(),
            name: username.to_string(),
        });
        self
    }

    /// Appends an annotation rectangle.
    pub fn rect(mut self, rect: [f64; 4]) -> Self {
        self.snapshot.rects.push(rect);
        self
    }

    /// Returns the snapshot.
    pub fn build(self) -> ItemSnapshot {
        self.snapshot
    }
}

/// Builds an [`ItemBatch`].
#[derive(Debug, Clone)]
pub struct BatchBuilder {
    batch: ItemBatch,
}

impl BatchBuilder {
    /// Starts a batch for a user library.
    pub fn user(id: &str) -> Self {
        Self {
            batch: ItemBatch::new(LibraryRef::user(id)),
        }
    }

    /// Starts a batch for a group library.
    pub fn group(id: &str, name: &str) -> Self {
        Self {
            batch: ItemBatch::new(LibraryRef::group(id, name)),
        }
    }

    /// Adds a snapshot, moving it into the batch's library.
    pub fn item(mut self, builder: SnapshotBuilder) -> Self {
        let mut snapshot = builder.build();
        snapshot.library = self.batch.library.clone();
        self.batch.items.push(snapshot);
        self
    }

    /// Adds a snapshot unchanged.
    pub fn raw(mut self, snapshot: ItemSnapshot) -> Self {
        self.batch.items.push(snapshot);
        self
    }

    /// Returns the batch.
    pub fn build(self) -> ItemBatch {
        self.batch
    }
}
