//! Consensus error types.

use thiserror::Error;

/// Errors from the Raft state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RaftError {
    /// Leader-only operation invoked elsewhere; no state was changed.
    #[error("Not the leader")]
    NotLeader,

    /// Log is at capacity; retry after an epoch boundary.
    #[error("Log full: capacity {capacity}")]
    LogFull { capacity: usize },

    /// Entry payload exceeds the fixed data field.
    #[error("Entry data too large: {actual} bytes, limit {limit}")]
    EntryTooLarge { actual: usize, limit: usize },

    /// Peer table is full.
    #[error("Too many peers: capacity {capacity}")]
    TooManyPeers { capacity: usize },

    /// An epoch is already running.
    #[error("Epoch already in progress")]
    EpochInProgress,

    /// No epoch is running.
    #[error("No epoch active")]
    EpochNotActive,
}
