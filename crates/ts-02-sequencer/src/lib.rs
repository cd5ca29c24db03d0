//! # TS-02: Guest Sequencer
//!
//! The single-node fallback path: raw L2 token logs are ingested with a
//! monotone sequence id, ordered deterministically, and applied to
//! per-token balance tries without any consensus round. Shares the trie
//! contract with the cluster path but none of its DAG machinery.

pub mod domain;
pub mod service;

pub use domain::entities::{LogKind, TokenLog};
pub use domain::errors::SequencerError;
pub use service::{Sequencer, MAX_SEQUENCER_LOGS, MAX_SEQUENCER_TOKENS};
