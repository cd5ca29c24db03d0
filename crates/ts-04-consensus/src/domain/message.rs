//! Raft RPC shapes. These ride the wire layer as bincode payloads inside
//! the authenticated envelope.

use super::state::LogEntry;
use serde::{Deserialize, Serialize};
use shared_types::NodeId;

/// A Raft RPC addressed between two replicas.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaftMessage {
    pub from: NodeId,
    pub to: NodeId,
    pub rpc: RaftRpc,
}

/// RPC payloads of the Raft subset in use.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaftRpc {
    RequestVote {
        term: u64,
        last_log_index: u64,
        last_log_term: u64,
    },
    VoteResponse {
        term: u64,
        vote_granted: bool,
    },
    AppendEntries {
        term: u64,
        prev_log_index: u64,
        prev_log_term: u64,
        leader_commit: u64,
        entries: Vec<LogEntry>,
    },
    AppendResponse {
        term: u64,
        success: bool,
        match_index: u64,
    },
}
