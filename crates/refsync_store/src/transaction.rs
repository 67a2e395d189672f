//! Write transactions.

use crate::graph::Graph;
use crate::types::{SequenceNumber, TransactionId};
use std::ops::{Deref, DerefMut};

/// A write transaction over a private copy of the graph.
///
/// All edits go to the copy. The store swaps it in when the transaction
/// closure returns `Ok` and drops it otherwise, so readers never observe a
/// half-applied change.
#[derive(Debug)]
pub struct Transaction {
    id: TransactionId,
    snapshot_seq: SequenceNumber,
    graph: Graph,
}

impl Transaction {
    pub(crate) fn new(id: TransactionId, snapshot_seq: SequenceNumber, graph: Graph) -> Self {
        Self {
            id,
            snapshot_seq,
            graph,
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the sequence number of the commit this transaction started from.
    #[must_use]
    pub fn snapshot_seq(&self) -> SequenceNumber {
        self.snapshot_seq
    }

    /// Returns the working graph.
    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Returns the working graph for modification.
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub(crate) fn into_graph(self) -> Graph {
        self.graph
    }
}

impl Deref for Transaction {
    type Target = Graph;

    fn deref(&self) -> &Graph {
        &self.graph
    }
}

impl DerefMut for Transaction {
    fn deref_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }
}
