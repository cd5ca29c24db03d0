//! # TS-03: Merkle-CRDT Operation DAG
//!
//! The conflict-ordering core of the cluster. Every ingested operation
//! becomes a DAG node; operations touching the same `(account, token)` pair
//! with opposing balance semantics are forced into a causal
//! parent→child order chosen by the leader's sort order, while commuting
//! operations are linked only as informational neighbors.
//!
//! ## Architecture
//!
//! - **Arena**: nodes live in a vector, edges are indices; the synthetic
//!   head occupies the reserved first slot
//! - **Conflict index**: bucketed by a salted digest of `(account, token)`,
//!   making conflict detection O(1) amortized per insert
//! - **Validation**: whole-transaction simulation against a sandbox copy of
//!   the trie balances
//! - **State propagation**: lazy parent application keeps the trie exactly
//!   one causal step behind the frontier
//!
//! ## Invariants
//!
//! - The DAG is acyclic: conflict edges always point from the
//!   lower-sort-order operation to the higher one.
//! - A node's Merkle hash is the digest of its operation hash and the
//!   Merkle hashes of its links, recomputed whenever the link sets change.
//! - Failed transactions stay in the DAG; they are skipped by state
//!   application and committed to by the reject root instead.

pub mod dag;
pub mod domain;
pub mod validation;

pub use dag::{MerkleDag, CONFLICT_INDEX_SIZE, MAX_DAG_NODES, NEIGHBOR_SAMPLE, THIN_THRESHOLD};
pub use domain::errors::DagError;
pub use domain::node::{DagNode, DagNodeRecord, NodeIdx, HEAD_NODE_ID, MAX_CHILDREN, MAX_PARENTS};
pub use validation::{is_conflict, validate_tx};
