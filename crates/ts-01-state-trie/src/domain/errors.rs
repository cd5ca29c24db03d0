//! Trie error types.

use thiserror::Error;

/// Errors from trie operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrieError {
    /// Key exceeds 64 bytes or value exceeds 256 bytes.
    #[error("Input too large: {what} is {actual} bytes, limit {limit}")]
    InputTooLarge {
        what: &'static str,
        actual: usize,
        limit: usize,
    },

    /// Delete target was not present.
    #[error("Key not found")]
    KeyNotFound,
}
