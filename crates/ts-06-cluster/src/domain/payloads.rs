//! Envelope payload shapes. All of these ride as bincode (fixed-width,
//! little-endian) inside the authenticated envelope; the type tag on the
//! envelope selects which shape to decode.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use shared_types::{ChainId, EpochId, ExecutedTx, Hash32, NodeId, TxRequest};
use ts_03_merkle_dag::DagNodeRecord;

/// One chunk of the leader's sorted transaction order. `base_order` is
/// the global position of the first entry, so followers reconstruct the
/// full sort-info map across chunks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortedTxsPayload {
    pub epoch_id: EpochId,
    pub base_order: u64,
    pub txs: Vec<TxRequest>,
}

/// A DAG node pushed to (or returned to) a peer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DagNodePayload {
    pub chain_id: ChainId,
    pub record: DagNodeRecord,
}

/// Request for a node absent from the local DAG.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDagNodePayload {
    pub chain_id: ChainId,
    pub node_id: u64,
}

/// The leader's end-of-epoch executed-transaction set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxSetBroadcastPayload {
    pub epoch_id: EpochId,
    pub txs: Vec<ExecutedTx>,
}

/// A follower's countersignature over the broadcast tx set.
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxSetSignaturePayload {
    pub epoch_id: EpochId,
    pub node_id: NodeId,
    #[serde_as(as = "Bytes")]
    pub signature: [u8; 64],
}

/// The ratified commitment triple pushed back toward the L2 chains.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochSyncPayload {
    pub epoch_id: EpochId,
    pub dag_head: Hash32,
    pub state_root: Hash32,
    pub reject_root: Hash32,
}

/// DAG root exchange used by the sync request/response pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRootPayload {
    pub chain_id: ChainId,
    pub dag_root: Hash32,
}
