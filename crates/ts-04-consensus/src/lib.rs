//! # TS-04: Consensus
//!
//! The crash-fault Raft subset driving leader election, log replication
//! and epoch boundaries for a ≤16-node cluster.
//!
//! The state machine is tick-driven and transport-free: [`Raft::tick`] and
//! [`Raft::handle_message`] return the messages to send, and the caller
//! (the cluster coordinator) moves them through the wire layer. One tick
//! is one logical millisecond.
//!
//! ## Failure semantics
//!
//! Dropped messages are retried on the next tick; a partitioned minority
//! cannot commit; a split vote re-randomizes the election timeout.

pub mod domain;
pub mod raft;

pub use domain::errors::RaftError;
pub use domain::message::{RaftMessage, RaftRpc};
pub use domain::state::{LogEntry, PeerState, RaftRole, MAX_ENTRY_DATA};
pub use raft::{
    Raft, ELECTION_TIMEOUT_MAX, ELECTION_TIMEOUT_MIN, HEARTBEAT_INTERVAL, MAX_ENTRIES_PER_MESSAGE,
    MAX_LOG_ENTRIES, MAX_RAFT_NODES,
};
