//! Channel kinds and the abstract guest contract.

use crate::errors::ChannelError;
use shared_types::NodeId;

/// Deployment variants of the guest channel. All satisfy the same
/// contract; only [`ChannelKind::HostMediated`] is mandatory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelKind {
    HostMediated,
    SharedMemory,
    VirtualNet,
    SecureChannel,
}

/// The symmetric byte-channel contract every kind satisfies.
pub trait GuestChannel {
    /// Queue `bytes` for guest `dst`.
    fn send(&self, dst: NodeId, bytes: &[u8]) -> Result<(), ChannelError>;

    /// Pop the next inbound message, returning `(bytes, source guest)`.
    fn receive(&self) -> Option<(Vec<u8>, NodeId)>;

    /// Queue `bytes` for every other registered guest; returns how many
    /// inboxes it reached.
    fn broadcast(&self, bytes: &[u8]) -> Result<usize, ChannelError>;
}
