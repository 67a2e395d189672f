//! Test fixtures and store helpers.

use chrono::{TimeZone, Utc};
use refsync_store::model::Item;
use refsync_store::{EntityKey, FixedClock, LibraryId, Store, StoreConfig, StoreError};
use std::path::PathBuf;
use tempfile::TempDir;

/// Library id used by fixtures unless a test picks its own.
pub const TEST_LIBRARY: &str = "u1";

/// A test store with automatic cleanup.
pub struct TestStore {
    /// The store instance.
    pub store: Store,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Creates a new in-memory test store.
    pub fn memory() -> Self {
        Self {
            store: Store::open_in_memory(),
            _temp_dir: None,
        }
    }

    /// Creates a new file-backed test store.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("store.json");
        let store = Store::open(&path, StoreConfig::default().pretty(true))
            .expect("Failed to open file store");

        Self {
            store,
            _temp_dir: Some(temp_dir),
        }
    }

    /// Returns the store file path if file-backed, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self.store.path().map(|p| p.to_path_buf())
    }

    /// Inserts items as-is in one transaction.
    pub fn seed(&self, items: impl IntoIterator<Item = Item>) {
        self.store
            .transaction(|txn| {
                for item in items {
                    txn.insert_item(item);
                }
                Ok::<_, StoreError>(())
            })
            .expect("Failed to seed store");
    }

    /// Returns a copy of an item from the committed graph.
    pub fn item(&self, key: &str) -> Option<Item> {
        self.item_in(TEST_LIBRARY, key)
    }

    /// Returns a copy of an item of a specific library.
    pub fn item_in(&self, library: &str, key: &str) -> Option<Item> {
        let key = EntityKey::new(LibraryId::new(library), key);
        self.store.read(|graph| graph.item(&key).cloned())
    }
}

impl std::ops::Deref for TestStore {
    type Target = Store;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Clock pinned to 2024-01-01T00:00:00Z.
pub fn fixed_clock() -> FixedClock {
    FixedClock::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .expect("valid fixed timestamp"),
    )
}

/// Runs a test with a temporary in-memory store.
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&Store) -> R,
{
    let test_store = TestStore::memory();
    f(&test_store.store)
}

/// Runs a test with a temporary file-backed store.
pub fn with_file_store<F, R>(f: F) -> R
where
    F: FnOnce(&Store, &std::path::Path) -> R,
{
    let test_store = TestStore::file();
    let path = test_store.path().expect("File store should have a path");
    f(&test_store.store, &path)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use refsync_store::model::{ItemChange, TagType};

    /// A synced book in the test library.
    pub fn synced_book(key: &str, title: &str) -> Item {
        let mut item = Item::new(LibraryId::new(TEST_LIBRARY), key, "book");
        item.version = 1;
        item.fields
            .push(refsync_store::model::Field::new("title", title));
        item.derived.base_title = title.to_string();
        item
    }

    /// A book with an unsynced local title edit.
    pub fn locally_edited_book(key: &str, title: &str) -> Item {
        let mut item = synced_book(key, title);
        if let Some(field) = item.fields.iter_mut().find(|f| f.key == "title") {
            field.changed = true;
        }
        item.mark_changed(ItemChange::Fields);
        item
    }

    /// A book deleted locally but not yet uploaded.
    pub fn locally_deleted_book(key: &str) -> Item {
        let mut item = synced_book(key, "Deleted");
        item.deleted = true;
        item
    }

    /// A store holding one synced book tagged with `tags`.
    pub fn store_with_tagged_book(key: &str, tags: &[&str]) -> TestStore {
        let store = TestStore::memory();
        store.seed([synced_book(key, "Tagged")]);
        store
            .transaction(|txn| {
                let entity = EntityKey::new(LibraryId::new(TEST_LIBRARY), key);
                let mut item = txn
                    .take_item(&entity)
                    .ok_or_else(|| StoreError::item_not_found(&entity))?;
                for tag in tags {
                    txn.link_tag(&mut item, tag, TagType::Manual);
                }
                txn.insert_item(item);
                Ok::<_, StoreError>(())
            })
            .expect("Failed to tag book");
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_seeds() {
        let store = TestStore::memory();
        store.seed([scenarios::synced_book("BOOK2345", "Optics")]);
        assert_eq!(store.item("BOOK2345").unwrap().version, 1);
        assert!(store.path().is_none());
    }

    #[test]
    fn file_store_has_path() {
        with_file_store(|store, path| {
            store
                .transaction(|txn| {
                    txn.insert_item(scenarios::synced_book("BOOK2345", "Optics"));
                    Ok::<_, StoreError>(())
                })
                .unwrap();
            assert!(path.exists());
        });
    }

    #[test]
    fn tagged_scenario_is_symmetric() {
        let store = scenarios::store_with_tagged_book("BOOK2345", &["a", "b"]);
        let item = store.item("BOOK2345").unwrap();
        assert_eq!(item.tags.len(), 2);
        store.read(|graph| assert_eq!(graph.tags().count(), 2));
    }
}
