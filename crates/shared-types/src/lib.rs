//! # Shared Types
//!
//! Record shapes shared by every settlement-node subsystem: fixed-width
//! addresses and amounts, the canonical operation record, and the
//! cluster-level bookkeeping records (executed txs, sort info, epoch
//! outputs).
//!
//! Byte-for-byte agreement on the encodings defined here is a correctness
//! prerequisite for the DAG and epoch commitments, so every multi-byte
//! integer is encoded little-endian at a fixed width.

pub mod errors;
pub mod operation;
pub mod primitives;
pub mod records;

pub use errors::OperationError;
pub use operation::{OpKind, Operation, REVERSE_OPERATION_FLAG};
pub use primitives::{
    balance_key, AccountAddress, Amount, ChainId, EpochId, Hash32, NodeId, OperationId,
    TokenAddress, TxId, ZERO_HASH,
};
pub use records::{EpochOutput, ExecutedTx, TxRequest, TxSortInfo};
