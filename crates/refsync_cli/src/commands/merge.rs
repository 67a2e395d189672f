//! Merge command implementation.

use refsync_engine::{MergeEngine, MergeOptions, MergeOutcome};
use refsync_protocol::ItemBatch;
use refsync_store::{Schema, Store, StoreConfig};
use serde::Serialize;
use std::path::Path;

/// Merge result as printed.
#[derive(Debug, Serialize)]
pub struct MergeReport {
    /// Library the batch belongs to.
    pub library: String,
    /// Keys of written items.
    pub merged: Vec<String>,
    /// Skipped items.
    pub conflicts: Vec<ConflictReport>,
}

/// One skipped item.
#[derive(Debug, Serialize)]
pub struct ConflictReport {
    /// Item key.
    pub key: String,
    /// Conflict kind.
    pub kind: String,
}

impl MergeReport {
    fn new(batch: &ItemBatch, outcome: MergeOutcome) -> Self {
        Self {
            library: batch.library.id.to_string(),
            merged: outcome.merged,
            conflicts: outcome
                .conflicts
                .iter()
                .map(|conflict| ConflictReport {
                    key: conflict.key().to_string(),
                    kind: conflict.kind.to_string(),
                })
                .collect(),
        }
    }
}

/// Runs the merge command.
pub fn run(
    store_path: &Path,
    batch_path: &Path,
    prefer_remote: bool,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = Store::open(store_path, StoreConfig::default())?;
    let report = merge_file(&store, batch_path, prefer_remote)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            print_text_output(&report);
        }
    }

    Ok(())
}

fn merge_file(
    store: &Store,
    batch_path: &Path,
    prefer_remote: bool,
) -> Result<MergeReport, Box<dyn std::error::Error>> {
    let json = std::fs::read_to_string(batch_path)
        .map_err(|e| format!("Cannot read batch {:?}: {}", batch_path, e))?;
    let batch = ItemBatch::from_json(&json)?;

    let engine = MergeEngine::new(Schema::builtin());
    let options = MergeOptions::new().prefer_remote_data(prefer_remote);
    let outcome = engine.apply(store, &batch, options)?;

    Ok(MergeReport::new(&batch, outcome))
}

fn print_text_output(report: &MergeReport) {
    println!("Library {}", report.library);
    println!("  Merged:    {}", report.merged.len());
    println!("  Conflicts: {}", report.conflicts.len());

    if !report.conflicts.is_empty() {
        println!();
        println!("Skipped items:");
        for conflict in &report.conflicts {
            println!("  {} ({})", conflict.key, conflict.kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use refsync_testkit::prelude::*;

    #[test]
    fn merges_batch_file_and_reports_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let batch_path = dir.path().join("batch.json");
        let batch = BatchBuilder::user(TEST_LIBRARY)
            .item(SnapshotBuilder::new("BOOK2345", "book").field("title", "Optics"))
            .item(SnapshotBuilder::new("EDIT2345", "book").field("title", "Remote"))
            .build();
        std::fs::write(&batch_path, serde_json::to_string(&batch).unwrap()).unwrap();

        let store = TestStore::memory();
        store.seed([scenarios::locally_edited_book("EDIT2345", "Local")]);

        let report = merge_file(&store, &batch_path, false).unwrap();
        assert_eq!(report.library, TEST_LIBRARY);
        assert_eq!(report.merged, vec!["BOOK2345"]);
        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.conflicts[0].key, "EDIT2345");
        assert_eq!(report.conflicts[0].kind, "changed-locally");

        let report = merge_file(&store, &batch_path, true).unwrap();
        assert!(report.conflicts.is_empty());
    }

    #[test]
    fn malformed_batch_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let batch_path = dir.path().join("batch.json");
        std::fs::write(&batch_path, "{\"items\": 3}").unwrap();

        let store = TestStore::memory();
        assert!(merge_file(&store, &batch_path, false).is_err());
        assert!(merge_file(&store, &dir.path().join("missing.json"), false).is_err());
    }
}
