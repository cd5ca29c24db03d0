//! Cluster error types.
//!
//! At the public surface errors collapse onto a small integer code set
//! via [`ClusterError::code`]; zero is success and never appears here.

use shared_types::{NodeId, TxId};
use thiserror::Error;
use ts_01_state_trie::TrieError;
use ts_03_merkle_dag::DagError;
use ts_04_consensus::RaftError;
use ts_05_wire::WireError;

/// Errors surfaced by the cluster API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClusterError {
    /// Bad argument: unknown token, unknown tx id, malformed payload.
    #[error("Invalid input: {0}")]
    InputInvalid(&'static str),

    /// A fixed table is full; retry after an epoch boundary.
    #[error("Capacity exceeded: {what}")]
    CapacityExceeded { what: &'static str },

    /// Leader-only operation invoked on a follower.
    #[error("Not the leader")]
    NotLeader,

    /// An epoch is already running.
    #[error("Epoch already in progress")]
    EpochInProgress,

    /// No epoch is running.
    #[error("No epoch active")]
    EpochNotActive,

    /// The owning transaction failed validation; its nodes stay in the
    /// DAG and count toward the reject root.
    #[error("Transaction {tx_id} failed validation")]
    TxValidationFailed { tx_id: TxId },

    /// Unicast target is unknown or inactive.
    #[error("Peer {node_id} unreachable")]
    PeerUnreachable { node_id: NodeId },

    /// Epoch collection has not reached a majority yet; state is kept and
    /// collection may resume.
    #[error("No majority: {have} of {need} matching outputs")]
    NoMajority { have: usize, need: usize },
}

impl ClusterError {
    /// The public integer code; zero is reserved for success.
    pub fn code(&self) -> i32 {
        match self {
            ClusterError::InputInvalid(_) => 1,
            ClusterError::CapacityExceeded { .. } => 2,
            ClusterError::NotLeader => 3,
            ClusterError::EpochInProgress => 4,
            ClusterError::EpochNotActive => 5,
            ClusterError::TxValidationFailed { .. } => 6,
            ClusterError::PeerUnreachable { .. } => 7,
            ClusterError::NoMajority { .. } => 8,
        }
    }
}

impl From<TrieError> for ClusterError {
    fn from(err: TrieError) -> Self {
        match err {
            TrieError::InputTooLarge { .. } => ClusterError::InputInvalid("trie input too large"),
            TrieError::KeyNotFound => ClusterError::InputInvalid("key not found"),
        }
    }
}

impl From<DagError> for ClusterError {
    fn from(err: DagError) -> Self {
        match err {
            DagError::DagFull { .. } => ClusterError::CapacityExceeded { what: "dag" },
            DagError::DuplicateOperation { .. } => {
                ClusterError::InputInvalid("duplicate operation id")
            }
            DagError::UnknownNode { .. } => ClusterError::InputInvalid("unknown dag node"),
            DagError::MissingParents { .. } => ClusterError::InputInvalid("missing dag parents"),
            DagError::Trie(trie) => trie.into(),
        }
    }
}

impl From<RaftError> for ClusterError {
    fn from(err: RaftError) -> Self {
        match err {
            RaftError::NotLeader => ClusterError::NotLeader,
            RaftError::LogFull { .. } => ClusterError::CapacityExceeded { what: "raft log" },
            RaftError::EntryTooLarge { .. } => ClusterError::InputInvalid("log entry too large"),
            RaftError::TooManyPeers { .. } => ClusterError::CapacityExceeded { what: "raft peers" },
            RaftError::EpochInProgress => ClusterError::EpochInProgress,
            RaftError::EpochNotActive => ClusterError::EpochNotActive,
        }
    }
}

impl From<WireError> for ClusterError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::PeerUnreachable { node_id } => ClusterError::PeerUnreachable { node_id },
            WireError::NoActivePeers => ClusterError::PeerUnreachable { node_id: 0 },
            WireError::PayloadTooLarge { .. } => ClusterError::InputInvalid("payload too large"),
            WireError::TooManyPeers { .. } => ClusterError::CapacityExceeded { what: "roster" },
            WireError::Malformed(_) => ClusterError::InputInvalid("malformed frame"),
        }
    }
}
