//! # Cluster Bookkeeping Records
//!
//! Shapes exchanged between the coordinator, the wire layer and the L2
//! boundary: transfer requests awaiting the leader's sort, confirmations
//! observed on L2 chains, the leader-distributed sort order, and the
//! per-epoch commitment triple.

use crate::primitives::{
    AccountAddress, Amount, ChainId, EpochId, Hash32, NodeId, TokenAddress, TxId,
};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};

/// A transfer request pending leader ordering.
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRequest {
    pub tx_id: TxId,
    pub timestamp: u64,
    pub from: AccountAddress,
    pub to: AccountAddress,
    pub token: TokenAddress,
    pub amount: Amount,
    /// Submitter signature, opaque to the core.
    #[serde_as(as = "Bytes")]
    pub signature: [u8; 65],
    pub chain_id: ChainId,
    pub is_processed: bool,
}

/// An L2 confirmation for a settled transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutedTx {
    pub tx_id: TxId,
    pub chain_id: ChainId,
    pub block_number: u64,
    pub log_index: u64,
    /// True once the confirming log has been observed.
    pub has_log: bool,
}

/// Leader-assigned position of one transaction in the epoch order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxSortInfo {
    pub tx_id: TxId,
    pub sort_order: u64,
    pub sort_timestamp: u64,
}

/// One node's signed commitment triple for an epoch.
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochOutput {
    pub epoch_id: EpochId,
    pub node_id: NodeId,
    pub dag_head: Hash32,
    pub state_root: Hash32,
    pub reject_root: Hash32,
    #[serde_as(as = "Bytes")]
    pub signature: [u8; 64],
}

impl EpochOutput {
    /// Bytes covered by the signature: every field except the signature
    /// itself, fixed widths, little-endian, declaration order.
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(8 + 4 + 32 * 3);
        bytes.extend_from_slice(&self.epoch_id.to_le_bytes());
        bytes.extend_from_slice(&self.node_id.to_le_bytes());
        bytes.extend_from_slice(&self.dag_head);
        bytes.extend_from_slice(&self.state_root);
        bytes.extend_from_slice(&self.reject_root);
        bytes
    }

    /// True when both outputs carry the same commitment triple, byte for
    /// byte. Ratification counts matches of this predicate.
    pub fn same_commitment(&self, other: &EpochOutput) -> bool {
        self.dag_head == other.dag_head
            && self.state_root == other.state_root
            && self.reject_root == other.reject_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_output(node_id: NodeId, fill: u8) -> EpochOutput {
        EpochOutput {
            epoch_id: 3,
            node_id,
            dag_head: [fill; 32],
            state_root: [fill; 32],
            reject_root: [0u8; 32],
            signature: [0u8; 64],
        }
    }

    #[test]
    fn test_same_commitment_ignores_node_and_signature() {
        let mut a = make_output(1, 0x42);
        let b = make_output(2, 0x42);
        a.signature = [9u8; 64];

        assert!(a.same_commitment(&b));
    }

    #[test]
    fn test_different_roots_do_not_match() {
        let a = make_output(1, 0x42);
        let b = make_output(2, 0x43);
        assert!(!a.same_commitment(&b));
    }

    #[test]
    fn test_signing_bytes_layout() {
        let output = make_output(0x01020304, 0xEE);
        let bytes = output.signing_bytes();

        assert_eq!(bytes.len(), 108);
        assert_eq!(&bytes[..8], &3u64.to_le_bytes());
        assert_eq!(&bytes[8..12], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&bytes[12..44], &[0xEE; 32]);
    }
}
