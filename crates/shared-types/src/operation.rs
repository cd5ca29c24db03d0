//! # Operation Records
//!
//! The atomic unit stored by the operation DAG. An operation is created by
//! the ingest path and never mutated afterwards, except for `is_valid`
//! which is cleared when the owning transaction fails validation.
//!
//! The content hash is a pure function of the semantic fields under the
//! canonical encoding below; two operations with equal hashes are
//! indistinguishable to the rest of the system.

use crate::errors::OperationError;
use crate::primitives::{AccountAddress, Amount, Hash32, OperationId, TokenAddress, TxId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Added to `operation_id` when deriving a compensating operation, keeping
/// reverse ids disjoint from producer-assigned ids.
pub const REVERSE_OPERATION_FLAG: u64 = 0x8000_0000_0000_0000;

/// Balance-mutation kind, stable wire values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpKind {
    /// Credit: add `amount` to the balance (wrapping on 256 bits).
    Add = 0,
    /// Debit: subtract `amount`; underflow fails the transaction.
    Subtract = 1,
    /// Overwrite the balance with `amount`.
    Set = 2,
}

impl OpKind {
    /// Stable numeric wire value.
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Decode from the event-source encoding (0 = credit, 1 = debit,
    /// 2 = set).
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(OpKind::Add),
            1 => Some(OpKind::Subtract),
            2 => Some(OpKind::Set),
            _ => None,
        }
    }

    /// ADD and SUBTRACT enter the conflict index; SET only overwrites.
    pub fn mutates_balance(self) -> bool {
        matches!(self, OpKind::Add | OpKind::Subtract)
    }
}

/// One balance operation observed on an L2 chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Producer-assigned unique id.
    pub operation_id: OperationId,
    /// Grouping key: the legs of one L2 transaction share a tx_id.
    pub tx_id: TxId,
    /// Producer clock, primary sort key.
    pub timestamp: u64,
    /// Balance semantics of this record.
    pub kind: OpKind,
    /// Token the balance belongs to.
    pub token: TokenAddress,
    /// Account whose balance is touched.
    pub account: AccountAddress,
    /// 256-bit big-endian value.
    pub amount: Amount,
    /// Content digest over the semantic fields, fixed at creation.
    pub hash: Hash32,
    /// Cleared when the owning transaction fails validation.
    pub is_valid: bool,
}

impl Operation {
    /// Build an operation and seal its content hash.
    pub fn new(
        operation_id: OperationId,
        tx_id: TxId,
        timestamp: u64,
        kind: OpKind,
        token: TokenAddress,
        account: AccountAddress,
        amount: Amount,
    ) -> Self {
        let mut op = Self {
            operation_id,
            tx_id,
            timestamp,
            kind,
            token,
            account,
            amount,
            hash: [0u8; 32],
            is_valid: true,
        };
        op.hash = op.content_hash();
        op
    }

    /// Canonical encoding hashed into the content digest: fixed widths,
    /// little-endian integers, declaration order. The timestamp is a
    /// transport hint, not content, and is excluded.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(8 + 8 + 4 + TokenAddress::LEN + AccountAddress::LEN + 32);
        bytes.extend_from_slice(&self.operation_id.to_le_bytes());
        bytes.extend_from_slice(&self.tx_id.to_le_bytes());
        bytes.extend_from_slice(&self.kind.as_u32().to_le_bytes());
        bytes.extend_from_slice(&self.token.0);
        bytes.extend_from_slice(&self.account.0);
        bytes.extend_from_slice(&self.amount.0);
        bytes
    }

    /// SHA-256 over [`Self::canonical_bytes`].
    pub fn content_hash(&self) -> Hash32 {
        let digest = Sha256::digest(self.canonical_bytes());
        digest.into()
    }

    /// Compensating operation for a failed L2 transaction: ADD↔SUBTRACT
    /// with a flagged id and a fresh content hash. SET cannot be undone.
    pub fn reversed(&self) -> Result<Operation, OperationError> {
        let kind = match self.kind {
            OpKind::Add => OpKind::Subtract,
            OpKind::Subtract => OpKind::Add,
            OpKind::Set => return Err(OperationError::IrreversibleSet),
        };

        Ok(Operation::new(
            self.operation_id.wrapping_add(REVERSE_OPERATION_FLAG),
            self.tx_id,
            self.timestamp,
            kind,
            self.token,
            self.account,
            self.amount,
        ))
    }
}
