//! # DAG Nodes
//!
//! Arena entries and the serializable record exchanged between replicas.
//! Nodes never own each other: all links are indices into the arena.

use serde::{Deserialize, Serialize};
use shared_types::{Hash32, Operation};

/// Maximum causal ancestors per node.
pub const MAX_PARENTS: usize = 16;

/// Maximum children (and neighbors) per node; also the head fan-in cap.
pub const MAX_CHILDREN: usize = 32;

/// Reserved id of the synthetic head entry.
pub const HEAD_NODE_ID: u64 = u64::MAX;

/// Index of a node in the DAG arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeIdx(pub usize);

/// One arena entry: an operation plus its causal links and lifecycle flags.
#[derive(Clone, Debug)]
pub struct DagNode {
    /// Equals the operation id; `HEAD_NODE_ID` for the head entry.
    pub node_id: u64,
    pub operation: Operation,
    /// Leader-assigned tie-break key for conflict edges.
    pub tx_sort_order: u64,
    /// Causal ancestors; this node appears after all of them.
    pub parents: Vec<NodeIdx>,
    /// Inverse of `parents`.
    pub children: Vec<NodeIdx>,
    /// Non-conflicting siblings, informational only.
    pub neighbors: Vec<NodeIdx>,
    /// Digest over the operation hash and all linked Merkle hashes.
    pub merkle_hash: Hash32,
    pub is_head_candidate: bool,
    pub is_processed: bool,
    /// True once the operation has been applied to the live trie.
    pub state_updated: bool,
    /// True when the owning transaction failed validation.
    pub is_failed: bool,
}

impl DagNode {
    /// Fresh unlinked entry for `operation`.
    pub fn new(operation: Operation, tx_sort_order: u64) -> Self {
        Self {
            node_id: operation.operation_id,
            operation,
            tx_sort_order,
            parents: Vec::new(),
            children: Vec::new(),
            neighbors: Vec::new(),
            merkle_hash: [0u8; 32],
            is_head_candidate: false,
            is_processed: false,
            state_updated: false,
            is_failed: false,
        }
    }

    /// Frontier leaf: no children yet and not consumed by an epoch.
    pub fn is_frontier(&self) -> bool {
        self.children.is_empty() && !self.is_processed
    }
}

/// Wire/sync form of one node: links carried as node ids so the receiver
/// can re-resolve them against its own arena.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DagNodeRecord {
    pub node_id: u64,
    pub operation: Operation,
    pub tx_sort_order: u64,
    pub parent_ids: Vec<u64>,
    pub merkle_hash: Hash32,
    pub is_head_candidate: bool,
    pub is_processed: bool,
    pub state_updated: bool,
    pub is_failed: bool,
}
