//! Purge-tags command implementation.

use refsync_store::{LibraryId, Store, StoreError};
use std::path::Path;
use tracing::info;

/// Runs the purge-tags command.
pub fn run(path: &Path, library: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let store = super::open_existing(path)?;
    let removed = purge(&store, library)?;

    info!(removed, "purged orphan tags");
    println!("Removed {} orphaned tag(s)", removed);
    Ok(())
}

fn purge(store: &Store, library: Option<&str>) -> Result<usize, StoreError> {
    let library = library.map(LibraryId::new);
    store.transaction(|txn| Ok(txn.purge_orphan_tags(library.as_ref())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use refsync_store::TagKey;
    use refsync_testkit::prelude::*;

    #[test]
    fn removes_only_orphans() {
        let store = scenarios::store_with_tagged_book("BOOK2345", &["kept", "dropped"]);
        store
            .transaction(|txn| {
                let key = refsync_store::EntityKey::new(LibraryId::new(TEST_LIBRARY), "BOOK2345");
                let mut item = txn.take_item(&key).ok_or_else(|| StoreError::item_not_found(&key))?;
                txn.unlink_tag(&mut item, "dropped");
                txn.insert_item(item);
                Ok::<_, StoreError>(())
            })
            .unwrap();

        assert_eq!(purge(&store, Some("g9")).unwrap(), 0);
        assert_eq!(purge(&store, None).unwrap(), 1);

        store.read(|graph| {
            let library = LibraryId::new(TEST_LIBRARY);
            assert!(graph.tag(&TagKey::new(library.clone(), "kept")).is_some());
            assert!(graph.tag(&TagKey::new(library, "dropped")).is_none());
        });
    }
}
