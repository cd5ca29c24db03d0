//! Wire error types.

use shared_types::NodeId;
use thiserror::Error;

/// Errors from envelope framing and peer messaging.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// Payload exceeds the 4096-byte envelope field.
    #[error("Payload too large: {actual} bytes, limit {limit}")]
    PayloadTooLarge { actual: usize, limit: usize },

    /// Unicast target is unknown or inactive.
    #[error("Peer {node_id} unreachable")]
    PeerUnreachable { node_id: NodeId },

    /// Broadcast found no active peer to deliver to.
    #[error("No active peers")]
    NoActivePeers,

    /// Roster is full.
    #[error("Too many peers: capacity {capacity}")]
    TooManyPeers { capacity: usize },

    /// Frame failed structural decoding.
    #[error("Malformed frame: {0}")]
    Malformed(&'static str),
}
