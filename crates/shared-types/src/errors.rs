//! # Error Types
//!
//! Errors raised while constructing or transforming operation records.

use thiserror::Error;

/// Errors from operation construction and reversal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    /// SET overwrites the previous balance, so no compensating
    /// operation can be derived from the record alone.
    #[error("SET operations are irreversible")]
    IrreversibleSet,
}
