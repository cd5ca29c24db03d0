//! Records crossing the L2 boundary.

use serde::{Deserialize, Serialize};
use shared_types::{
    AccountAddress, Amount, ChainId, Hash32, OpKind, Operation, OperationId, TokenAddress, TxId,
};

/// One observed L2 block header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct L2BlockHeader {
    pub block_number: u64,
    pub block_hash: Hash32,
    pub parent_hash: Hash32,
    pub state_root: Hash32,
    pub receipts_root: Hash32,
    pub timestamp: u64,
    pub chain_id: ChainId,
}

/// One event log observed in an L2 block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct L2LogEntry {
    pub tx_hash: Hash32,
    pub log_index: u32,
    pub contract_address: AccountAddress,
    /// Up to four indexed topics.
    pub topics: Vec<Hash32>,
    /// Event data, at most 256 bytes.
    pub data: Vec<u8>,
    pub block_number: u64,
    pub chain_id: ChainId,
}

/// Merkle path from a log hash up to a block's receipts root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogExistenceProof {
    /// Sibling hashes, leaf to root, at most 32 levels.
    pub siblings: Vec<Hash32>,
    /// Root the replay must land on.
    pub receipts_root: Hash32,
}

/// The raw event-source callback record crossing the chain boundary:
/// operation type is carried numerically (0 = credit, 1 = debit, 2 = set).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationEvent {
    pub chain_id: ChainId,
    pub operation_id: OperationId,
    pub tx_id: TxId,
    pub timestamp: u64,
    pub op_type: u32,
    pub token: TokenAddress,
    pub account: AccountAddress,
    pub amount: Amount,
}

impl OperationEvent {
    /// Decode into the canonical operation record; `None` when the
    /// numeric type is out of range.
    pub fn to_operation(&self) -> Option<Operation> {
        let kind = OpKind::from_u32(self.op_type)?;
        Some(Operation::new(
            self.operation_id,
            self.tx_id,
            self.timestamp,
            kind,
            self.token,
            self.account,
            self.amount,
        ))
    }
}
