//! Raft roles, log entries and peer bookkeeping.

use serde::{Deserialize, Serialize};
use shared_types::NodeId;

/// Maximum payload bytes carried by one log entry.
pub const MAX_ENTRY_DATA: usize = 256;

/// Raft role of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaftRole {
    Follower,
    Candidate,
    Leader,
}

/// One replicated log entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Term under which the entry was appended.
    pub term: u64,
    /// 1-based log position.
    pub index: u64,
    /// Transaction this entry settles, zero for control entries.
    pub tx_id: u64,
    pub timestamp: u64,
    /// Opaque payload, at most [`MAX_ENTRY_DATA`] bytes.
    pub data: Vec<u8>,
}

/// Per-peer replication state kept by the leader.
#[derive(Clone, Debug)]
pub struct PeerState {
    pub node_id: NodeId,
    /// Next log index to send to this peer (1-based).
    pub next_index: u64,
    /// Highest log index known replicated on this peer.
    pub match_index: u64,
    pub is_active: bool,
    /// Logical time of the last message from this peer.
    pub last_heartbeat: u64,
}

impl PeerState {
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            next_index: 1,
            match_index: 0,
            is_active: true,
            last_heartbeat: 0,
        }
    }
}
