//! # Host Mediator
//!
//! Host-side routing for the HOST_MEDIATED channel kind. One inbox per
//! registered guest behind a single mutex; host socket threads push in,
//! each guest's cooperative loop pops out. This table is the only state
//! in the system shared across OS threads.

use crate::channel::{ChannelKind, GuestChannel};
use crate::errors::ChannelError;
use parking_lot::Mutex;
use shared_types::NodeId;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::debug;

/// One queued message: payload and source guest.
type Delivery = (Vec<u8>, NodeId);

#[derive(Default)]
struct MediatorTable {
    inboxes: HashMap<NodeId, VecDeque<Delivery>>,
}

/// Host-side mediator owning the guest registration table.
#[derive(Clone, Default)]
pub struct HostMediator {
    table: Arc<Mutex<MediatorTable>>,
}

impl HostMediator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a guest and hand it its channel endpoint. Only the
    /// host-mediated kind is backed; other kinds are refused here.
    pub fn register_guest(
        &self,
        guest_id: NodeId,
        kind: ChannelKind,
    ) -> Result<GuestEndpoint, ChannelError> {
        if kind != ChannelKind::HostMediated {
            return Err(ChannelError::UnsupportedKind { kind });
        }

        let mut table = self.table.lock();
        if table.inboxes.contains_key(&guest_id) {
            return Err(ChannelError::AlreadyRegistered { guest_id });
        }
        table.inboxes.insert(guest_id, VecDeque::new());
        debug!(guest_id, "guest registered");

        Ok(GuestEndpoint {
            guest_id,
            table: Arc::clone(&self.table),
        })
    }

    /// Remove a guest and drop its pending messages.
    pub fn unregister_guest(&self, guest_id: NodeId) {
        self.table.lock().inboxes.remove(&guest_id);
    }

    pub fn guest_count(&self) -> usize {
        self.table.lock().inboxes.len()
    }
}

/// A guest's handle onto the mediated channel.
pub struct GuestEndpoint {
    guest_id: NodeId,
    table: Arc<Mutex<MediatorTable>>,
}

impl GuestEndpoint {
    pub fn guest_id(&self) -> NodeId {
        self.guest_id
    }
}

impl GuestChannel for GuestEndpoint {
    fn send(&self, dst: NodeId, bytes: &[u8]) -> Result<(), ChannelError> {
        let mut table = self.table.lock();
        let inbox = table
            .inboxes
            .get_mut(&dst)
            .ok_or(ChannelError::UnknownGuest { guest_id: dst })?;
        inbox.push_back((bytes.to_vec(), self.guest_id));
        Ok(())
    }

    fn receive(&self) -> Option<(Vec<u8>, NodeId)> {
        self.table
            .lock()
            .inboxes
            .get_mut(&self.guest_id)?
            .pop_front()
    }

    fn broadcast(&self, bytes: &[u8]) -> Result<usize, ChannelError> {
        let mut table = self.table.lock();
        let targets: Vec<NodeId> = table
            .inboxes
            .keys()
            .filter(|id| **id != self.guest_id)
            .copied()
            .collect();

        if targets.is_empty() {
            return Err(ChannelError::NoPeers);
        }

        for target in &targets {
            if let Some(inbox) = table.inboxes.get_mut(target) {
                inbox.push_back((bytes.to_vec(), self.guest_id));
            }
        }
        Ok(targets.len())
    }
}
