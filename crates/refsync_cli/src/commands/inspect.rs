//! Inspect command implementation.

use refsync_store::model::SyncState;
use refsync_store::Graph;
use serde::Serialize;
use std::path::Path;

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store file path.
    pub path: String,
    /// Committed transaction sequence.
    pub sequence: u64,
    /// Per-library statistics.
    pub libraries: Vec<LibraryStats>,
    /// Number of known users.
    pub user_count: usize,
}

/// Statistics for a single library.
#[derive(Debug, Default, Serialize)]
pub struct LibraryStats {
    /// Library id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Whether library metadata still needs fetching.
    pub outdated: bool,
    /// Number of items, including trashed ones.
    pub item_count: usize,
    /// Items with unsynced local changes.
    pub changed_count: usize,
    /// Items deleted locally and not yet uploaded.
    pub deleted_count: usize,
    /// Placeholder items waiting to be fetched.
    pub placeholder_count: usize,
    /// Number of collections.
    pub collection_count: usize,
    /// Number of tags.
    pub tag_count: usize,
    /// Tags no item carries.
    pub orphan_tag_count: usize,
}

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = super::open_existing(path)?;

    let result = InspectResult {
        path: path.display().to_string(),
        sequence: store.committed_seq().as_u64(),
        libraries: store.read(library_stats),
        user_count: store.read(|graph| graph.users().count()),
    };

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn library_stats(graph: &Graph) -> Vec<LibraryStats> {
    graph
        .libraries()
        .map(|library| {
            let mut stats = LibraryStats {
                id: library.id.to_string(),
                name: library.name.clone(),
                outdated: library.outdated,
                ..LibraryStats::default()
            };

            for item in graph.items().filter(|item| item.library == library.id) {
                stats.item_count += 1;
                if item.deleted {
                    stats.deleted_count += 1;
                } else if item.is_changed() {
                    stats.changed_count += 1;
                }
                if item.item_type.is_empty() && item.sync_state == SyncState::Dirty {
                    stats.placeholder_count += 1;
                }
            }
            stats.collection_count = graph
                .collections()
                .filter(|collection| collection.library == library.id)
                .count();
            for tag in graph.tags().filter(|tag| tag.library == library.id) {
                stats.tag_count += 1;
                if tag.is_orphan() {
                    stats.orphan_tag_count += 1;
                }
            }
            stats
        })
        .collect()
}

fn print_text_output(result: &InspectResult) {
    println!("refsync Store Inspection");
    println!("========================");
    println!();
    println!("Path:     {}", result.path);
    println!("Sequence: {}", result.sequence);
    println!("Users:    {}", result.user_count);

    for library in &result.libraries {
        println!();
        if library.name.is_empty() {
            println!("Library {}:", library.id);
        } else {
            println!("Library {} ({}):", library.id, library.name);
        }
        if library.outdated {
            println!("  (metadata outdated)");
        }
        println!("  Items:        {}", library.item_count);
        println!("  Changed:      {}", library.changed_count);
        println!("  Deleted:      {}", library.deleted_count);
        println!("  Placeholders: {}", library.placeholder_count);
        println!("  Collections:  {}", library.collection_count);
        println!(
            "  Tags:         {} ({} orphaned)",
            library.tag_count, library.orphan_tag_count
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use refsync_engine::{MergeEngine, MergeOptions};
    use refsync_store::Schema;
    use refsync_testkit::prelude::*;

    #[test]
    fn counts_per_library() {
        let store = TestStore::memory();
        let batch = BatchBuilder::user(TEST_LIBRARY)
            .item(SnapshotBuilder::new("BOOK2345", "book").tag("a").collection("COLL2345"))
            .item(SnapshotBuilder::new("NOTE2345", "note").parent("MISS2345"))
            .build();
        MergeEngine::new(Schema::builtin())
            .apply(&store, &batch, MergeOptions::default())
            .unwrap();
        store.seed([scenarios::locally_edited_book("EDIT2345", "Draft")]);

        let stats = store.read(library_stats);
        assert_eq!(stats.len(), 1);
        let library = &stats[0];
        assert_eq!(library.id, TEST_LIBRARY);
        assert_eq!(library.item_count, 4);
        assert_eq!(library.changed_count, 1);
        assert_eq!(library.placeholder_count, 1);
        assert_eq!(library.collection_count, 1);
        assert_eq!(library.tag_count, 1);
        assert_eq!(library.orphan_tag_count, 0);
    }
}
