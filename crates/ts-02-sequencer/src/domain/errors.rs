//! Sequencer error types.

use thiserror::Error;
use ts_01_state_trie::TrieError;

/// Errors from the fallback sequencing path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequencerError {
    /// The log queue is full; retry after a processing pass.
    #[error("Log queue full: capacity {capacity}")]
    LogQueueFull { capacity: usize },

    /// No room for another per-token trie.
    #[error("Too many tokens: capacity {capacity}")]
    TooManyTokens { capacity: usize },

    /// Token has no trie yet.
    #[error("Unknown token")]
    UnknownToken,

    /// Debit would underflow the account balance.
    #[error("Insufficient balance")]
    InsufficientBalance,

    /// Underlying trie refused the mutation.
    #[error("Trie error: {0}")]
    Trie(#[from] TrieError),
}
