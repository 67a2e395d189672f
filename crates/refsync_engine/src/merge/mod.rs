//! Merging remote item snapshots into the local graph.
//!
//! A batch is applied inside one store transaction. Structural problems abort
//! the whole batch; items with unsynced local state are reported as conflicts
//! and left untouched unless the caller asks for remote data to win.

mod attribution;
mod fields;
mod membership;

use crate::error::{MergeError, MergeResult};
use refsync_protocol::{ConflictKind, ItemBatch, ItemSnapshot, MergeConflict};
use refsync_store::display::refresh_titles;
use refsync_store::model::{ChangeSource, Item, SyncState};
use refsync_store::{Clock, EntityKey, Graph, Schema, Store, SystemClock};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Options for a merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Overwrite items with local edits or pending local deletions.
    pub prefer_remote_data: bool,
}

impl MergeOptions {
    /// Creates default options (local changes win).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether remote data overrides local state.
    pub fn prefer_remote_data(mut self, value: bool) -> Self {
        self.prefer_remote_data = value;
        self
    }
}

/// Result of merging a batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    /// Keys of the items that were written, in batch order.
    pub merged: Vec<String>,
    /// Snapshots that were skipped.
    pub conflicts: Vec<MergeConflict>,
}

impl MergeOutcome {
    /// Returns true if no snapshot was skipped.
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }
}

enum ItemMerge {
    Merged,
    Skipped(ConflictKind),
}

/// Applies remote snapshots to the local graph.
#[derive(Clone)]
pub struct MergeEngine {
    schema: Arc<Schema>,
    clock: Arc<dyn Clock>,
}

impl MergeEngine {
    /// Creates an engine using `schema` and the system clock.
    pub fn new(schema: Schema) -> Self {
        Self {
            schema: Arc::new(schema),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock used to stamp merged items.
    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Returns the item type schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Merges a batch in its own store transaction.
    ///
    /// On error nothing from the batch is written.
    pub fn apply(
        &self,
        store: &Store,
        batch: &ItemBatch,
        options: MergeOptions,
    ) -> MergeResult<MergeOutcome> {
        store.transaction(|txn| self.merge_batch(txn.graph_mut(), batch, options))
    }

    /// Merges a batch into a graph, typically a transaction's working copy.
    pub fn merge_batch(
        &self,
        graph: &mut Graph,
        batch: &ItemBatch,
        options: MergeOptions,
    ) -> MergeResult<MergeOutcome> {
        let mut outcome = MergeOutcome::default();

        for snapshot in &batch.items {
            validate(batch, snapshot)?;
            match self.merge_item(graph, batch, snapshot, options) {
                ItemMerge::Merged => outcome.merged.push(snapshot.key.clone()),
                ItemMerge::Skipped(kind) => {
                    warn!(
                        library = %batch.library.id,
                        item = %snapshot.key,
                        conflict = %kind,
                        "skipping remote item with local changes"
                    );
                    outcome
                        .conflicts
                        .push(MergeConflict::new(snapshot.clone(), kind));
                }
            }
        }

        info!(
            library = %batch.library.id,
            merged = outcome.merged.len(),
            conflicts = outcome.conflicts.len(),
            "merged batch"
        );
        Ok(outcome)
    }

    fn merge_item(
        &self,
        graph: &mut Graph,
        batch: &ItemBatch,
        snapshot: &ItemSnapshot,
        options: MergeOptions,
    ) -> ItemMerge {
        let key = EntityKey::new(batch.library.id.clone(), snapshot.key.as_str());

        // The item stays out of the arena while it is edited so the graph
        // helpers can update the other side of each relationship.
        let mut item = match graph.take_item(&key) {
            Some(item) => item,
            None => {
                debug!(item = %key, "creating item");
                Item::new(key.library.clone(), key.key.as_str(), snapshot.item_type.as_str())
            }
        };

        let before = item.clone();
        if let Some(kind) = conflict(&mut item, options) {
            graph.insert_item(item);
            return ItemMerge::Skipped(kind);
        }

        Self::set_scalars(&mut item, snapshot);
        fields::reconcile(&mut item, snapshot, &self.schema);

        let rects = snapshot.model_rects();
        if item.rects != rects {
            item.rects = rects;
        }
        if item.paths != snapshot.paths {
            item.paths.clone_from(&snapshot.paths);
        }

        membership::ensure_library(graph, &batch.library);
        membership::set_parent(graph, &mut item, snapshot);
        membership::set_collections(graph, &mut item, snapshot);
        membership::set_tags(graph, &mut item, snapshot);

        attribution::set_creators(&mut item, snapshot, &self.schema);
        attribution::set_relations_and_links(&mut item, snapshot);
        let detached = attribution::set_users(graph, &mut item, snapshot);

        refresh_titles(&mut item);

        // Re-merging an unchanged snapshot must leave the item identical.
        if item.last_synced.is_none() || item != before {
            item.last_synced = Some(self.clock.now());
        }

        graph.insert_item(item);
        for user in detached {
            graph.collect_user(user);
        }
        ItemMerge::Merged
    }

    fn set_scalars(item: &mut Item, snapshot: &ItemSnapshot) {
        item.item_type.clone_from(&snapshot.item_type);
        item.version = snapshot.version;
        item.trash = snapshot.trash;
        item.date_added = snapshot.date_added;
        item.date_modified = snapshot.date_modified;
        item.change_source = ChangeSource::Sync;
        item.sync_state = SyncState::Synced;
        item.sync_retries = 0;
    }
}

impl std::fmt::Debug for MergeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergeEngine")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

fn validate(batch: &ItemBatch, snapshot: &ItemSnapshot) -> MergeResult<()> {
    if snapshot.key.is_empty() {
        return Err(MergeError::invalid_snapshot("", "empty item key"));
    }
    if snapshot.parent_key.as_deref() == Some(snapshot.key.as_str()) {
        return Err(MergeError::invalid_snapshot(
            snapshot.key.as_str(),
            "item is its own parent",
        ));
    }
    if snapshot.library.id != batch.library.id {
        return Err(MergeError::LibraryMismatch {
            key: snapshot.key.clone(),
            expected: batch.library.id.to_string(),
            found: snapshot.library.id.to_string(),
        });
    }
    Ok(())
}

/// Decides whether local state blocks the snapshot.
///
/// When remote data is preferred the local markers are cleared instead.
fn conflict(item: &mut Item, options: MergeOptions) -> Option<ConflictKind> {
    if options.prefer_remote_data {
        item.deleted = false;
        item.reset_changes();
        return None;
    }
    if item.deleted {
        Some(ConflictKind::DeletedLocally)
    } else if item.is_changed() {
        Some(ConflictKind::ChangedLocally)
    } else {
        None
    }
}
