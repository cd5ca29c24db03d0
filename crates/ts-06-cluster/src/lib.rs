//! # TS-06: Cluster Coordinator
//!
//! Composes the trie, DAG, Raft and wire layers into one settlement
//! replica. The coordinator owns the pending-transaction queue, the
//! leader's sort order, the per-token tries, the global DAG and the epoch
//! protocol that turns all of it into a majority-ratified commitment
//! triple `(state_root, dag_head, reject_root)`.
//!
//! Every public operation takes the cluster handle explicitly; one handle
//! per node, owned by that node's event loop.

pub mod cluster;
pub mod consensus_link;
pub mod domain;
pub mod sync;


pub use cluster::{
    SettlementCluster, MAX_CLUSTER_NODES, MAX_CLUSTER_TOKENS, MAX_PENDING_TXS,
    SORTED_TXS_PER_ENVELOPE, TX_SET_PER_ENVELOPE,
};
pub use domain::entities::TeeNodeInfo;
pub use domain::errors::ClusterError;
pub use domain::payloads::{
    DagNodePayload, EpochSyncPayload, RequestDagNodePayload, SortedTxsPayload, SyncRootPayload,
    TxSetBroadcastPayload, TxSetSignaturePayload,
};
