//! DAG error types.

use thiserror::Error;
use ts_01_state_trie::TrieError;

/// Errors from DAG construction and synchronization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DagError {
    /// Arena is at capacity; retry after an epoch boundary.
    #[error("DAG full: capacity {capacity}")]
    DagFull { capacity: usize },

    /// An operation with this id is already present.
    #[error("Duplicate operation id {operation_id}")]
    DuplicateOperation { operation_id: u64 },

    /// Referenced node id is not in the arena.
    #[error("Unknown node id {node_id}")]
    UnknownNode { node_id: u64 },

    /// Remote node cannot be inserted until its parents are local.
    #[error("Missing {missing} parent(s) for remote node {node_id}")]
    MissingParents { node_id: u64, missing: usize },

    /// State application hit a trie limit.
    #[error("Trie error: {0}")]
    Trie(#[from] TrieError),
}
