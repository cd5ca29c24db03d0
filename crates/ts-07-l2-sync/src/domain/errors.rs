//! L2 sync error types.

use shared_types::ChainId;
use thiserror::Error;

/// Errors from the L2 boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum L2SyncError {
    /// Chain was never registered.
    #[error("Unknown chain {chain_id}")]
    UnknownChain { chain_id: ChainId },

    /// Chain table is full.
    #[error("Too many chains: capacity {capacity}")]
    TooManyChains { capacity: usize },

    /// `from_block > to_block`.
    #[error("Invalid block range {from_block}..={to_block}")]
    InvalidRange { from_block: u64, to_block: u64 },

    /// Header store cannot take the requested range.
    #[error("Header store full: capacity {capacity}")]
    HeaderStoreFull { capacity: usize },
}
