//! The store handle: committed graph, single writer, optional JSON file.

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::graph::Graph;
use crate::transaction::Transaction;
use crate::types::{SequenceNumber, TransactionId};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// On-disk layout of a persisted store.
#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    sequence: SequenceNumber,
    graph: Graph,
}

/// Shared handle to the local object graph.
///
/// Only one write transaction runs at a time. Readers see the last committed
/// graph.
pub struct Store {
    config: StoreConfig,
    path: Option<PathBuf>,
    graph: RwLock<Graph>,
    write_lock: Mutex<()>,
    next_txid: AtomicU64,
    committed_seq: AtomicU64,
}

impl Store {
    /// Opens a store that lives only in memory.
    #[must_use]
    pub fn open_in_memory() -> Self {
        Self::from_parts(StoreConfig::default(), None, Graph::new(), SequenceNumber::default())
    }

    /// Opens a store backed by a JSON file.
    ///
    /// A missing file yields an empty store when `create_if_missing` is set.
    pub fn open(path: impl AsRef<Path>, config: StoreConfig) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        let (graph, sequence) = if path.exists() {
            let bytes = fs::read(&path)?;
            let file: StoreFile = serde_json::from_slice(&bytes)?;
            info!(path = %path.display(), sequence = %file.sequence, "opened store");
            (file.graph, file.sequence)
        } else if config.create_if_missing {
            info!(path = %path.display(), "creating new store");
            (Graph::new(), SequenceNumber::default())
        } else {
            return Err(StoreError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("store file not found: {}", path.display()),
            )));
        };

        Ok(Self::from_parts(config, Some(path), graph, sequence))
    }

    fn from_parts(
        config: StoreConfig,
        path: Option<PathBuf>,
        graph: Graph,
        sequence: SequenceNumber,
    ) -> Self {
        Self {
            config,
            path,
            graph: RwLock::new(graph),
            write_lock: Mutex::new(()),
            next_txid: AtomicU64::new(1),
            committed_seq: AtomicU64::new(sequence.as_u64()),
        }
    }

    /// Returns the backing file path, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the sequence number of the last commit.
    #[must_use]
    pub fn committed_seq(&self) -> SequenceNumber {
        SequenceNumber::new(self.committed_seq.load(Ordering::SeqCst))
    }

    /// Runs `f` against the committed graph.
    pub fn read<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&Graph) -> T,
    {
        f(&self.graph.read())
    }

    /// Returns a copy of the committed graph.
    #[must_use]
    pub fn snapshot(&self) -> Graph {
        self.graph.read().clone()
    }

    /// Executes a function within a write transaction.
    ///
    /// The transaction is committed if the function returns `Ok`, and
    /// discarded if it returns `Err`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// store.transaction(|txn| {
    ///     txn.set_field(&key, "title", "Draft")?;
    ///     Ok::<_, StoreError>(())
    /// })?;
    /// ```
    pub fn transaction<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Transaction) -> Result<T, E>,
        E: From<StoreError>,
    {
        let _guard = self.write_lock.lock();

        let id = TransactionId::new(self.next_txid.fetch_add(1, Ordering::SeqCst));
        let mut txn = Transaction::new(id, self.committed_seq(), self.snapshot());

        match f(&mut txn) {
            Ok(value) => {
                let sequence = self.committed_seq().next();
                let graph = txn.into_graph();
                if self.config.persist_on_commit {
                    self.persist(&graph, sequence)?;
                }
                *self.graph.write() = graph;
                self.committed_seq.store(sequence.as_u64(), Ordering::SeqCst);
                debug!(txn = %id, %sequence, "committed");
                Ok(value)
            }
            Err(err) => {
                debug!(txn = %id, "rolled back");
                Err(err)
            }
        }
    }

    /// Writes the committed graph to the backing file.
    pub fn save(&self) -> StoreResult<()> {
        let _guard = self.write_lock.lock();
        let graph = self.graph.read();
        self.persist(&graph, self.committed_seq())
    }

    fn persist(&self, graph: &Graph, sequence: SequenceNumber) -> StoreResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let file = StoreFile {
            sequence,
            graph: graph.clone(),
        };
        let bytes = if self.config.pretty {
            serde_json::to_vec_pretty(&file)?
        } else {
            serde_json::to_vec(&file)?
        };

        // Write-then-rename keeps the previous file intact on failure.
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.path)
            .field("committed_seq", &self.committed_seq())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Item;
    use crate::types::{EntityKey, LibraryId};
    use tempfile::tempdir;

    fn key() -> EntityKey {
        EntityKey::new(LibraryId::new("u1"), "AAAA2222")
    }

    #[test]
    fn commit_on_ok() {
        let store = Store::open_in_memory();
        store
            .transaction(|txn| {
                txn.insert_item(Item::new(LibraryId::new("u1"), "AAAA2222", "book"));
                Ok::<_, StoreError>(())
            })
            .unwrap();

        assert!(store.read(|g| g.contains_item(&key())));
        assert_eq!(store.committed_seq(), SequenceNumber::new(1));
    }

    #[test]
    fn rollback_on_err() {
        let store = Store::open_in_memory();
        let result: StoreResult<()> = store.transaction(|txn| {
            txn.insert_item(Item::new(LibraryId::new("u1"), "AAAA2222", "book"));
            Err(StoreError::invalid_operation("abort"))
        });

        assert!(result.is_err());
        assert!(!store.read(|g| g.contains_item(&key())));
        assert_eq!(store.committed_seq(), SequenceNumber::default());
    }

    #[test]
    fn persists_and_reopens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");

        {
            let store = Store::open(&path, StoreConfig::default()).unwrap();
            store
                .transaction(|txn| {
                    txn.insert_item(Item::new(LibraryId::new("u1"), "AAAA2222", "book"));
                    txn.assign_tag(&key(), "saved")
                })
                .unwrap();
        }

        let reopened = Store::open(&path, StoreConfig::default()).unwrap();
        assert_eq!(reopened.committed_seq(), SequenceNumber::new(1));
        reopened.read(|g| {
            let item = g.item(&key()).unwrap();
            assert!(item.tags.contains_key("saved"));
        });
    }

    #[test]
    fn missing_file_without_create() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let result = Store::open(&path, StoreConfig::new().create_if_missing(false));
        assert!(matches!(result, Err(StoreError::Io(_))));
    }
}
