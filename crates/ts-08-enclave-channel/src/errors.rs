//! Channel error types.

use shared_types::NodeId;
use thiserror::Error;

/// Errors from guest↔guest messaging.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// Channel kind has no backing implementation in this deployment.
    #[error("Channel kind {kind:?} not supported")]
    UnsupportedKind { kind: crate::channel::ChannelKind },

    /// Destination guest is not registered.
    #[error("Unknown guest {guest_id}")]
    UnknownGuest { guest_id: NodeId },

    /// Guest id already registered.
    #[error("Guest {guest_id} already registered")]
    AlreadyRegistered { guest_id: NodeId },

    /// Broadcast found no other guest.
    #[error("No peers registered")]
    NoPeers,
}
