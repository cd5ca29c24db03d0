//! # TS-07: L2 Sync
//!
//! The boundary to the observed Layer-2 chains, in two halves:
//!
//! - **Full node**: a per-chain block-header store and log-existence
//!   verification by Merkle-proof replay against a header's receipts
//!   root, with round-robin assignment of verification work across the
//!   cluster.
//! - **Simulator**: the event source standing in for real chains. It
//!   synthesizes transfer/mint/burn operations and hands them to the
//!   cluster loop over a bounded channel from a single background thread.

pub mod domain;
pub mod full_node;
pub mod simulator;

pub use domain::entities::{L2BlockHeader, L2LogEntry, LogExistenceProof, OperationEvent};
pub use domain::errors::L2SyncError;
pub use full_node::{L2FullNode, MAX_BLOCK_HEADERS, MAX_L2_CHAINS};
pub use simulator::L2Simulator;
