//! # TS-08: Enclave Channel
//!
//! The symmetric byte channel between confidential guests. Four channel
//! kinds share one abstract contract; the host-mediated kind is the
//! mandatory deployment and the only one backed here. The mediator is the
//! single cross-thread structure in the system: a mutex-guarded
//! registration table of per-guest inboxes, drained by each guest's
//! cooperative loop.

pub mod channel;
pub mod errors;
pub mod mediator;

pub use channel::{ChannelKind, GuestChannel};
pub use errors::ChannelError;
pub use mediator::{GuestEndpoint, HostMediator};
