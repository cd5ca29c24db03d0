//! # Wire Network
//!
//! Per-node roster and message queues. Outbound envelopes are signed and
//! queued; whoever owns the transport drains the outbox and pushes
//! inbound frames into the inbox. Receives verify the sender's signature
//! against the roster before handing the envelope up.

use crate::envelope::{Envelope, MessageKind, MAX_PAYLOAD};
use crate::errors::WireError;
use shared_crypto::{NodeKeypair, NodePublicKey, NodeSignature};
use shared_types::NodeId;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Roster capacity.
pub const MAX_WIRE_PEERS: usize = 16;

/// One roster entry.
#[derive(Clone, Debug)]
pub struct PeerEntry {
    pub node_id: NodeId,
    pub public_key: NodePublicKey,
    pub is_active: bool,
    /// Logical time of the last verified envelope from this peer.
    pub last_seen: u64,
}

/// The wire endpoint of one replica.
pub struct WireNetwork {
    node_id: NodeId,
    keypair: NodeKeypair,
    peers: Vec<PeerEntry>,
    inbox: VecDeque<Envelope>,
    outbox: VecDeque<Envelope>,
    clock: u64,
}

impl WireNetwork {
    pub fn new(node_id: NodeId, keypair: NodeKeypair) -> Self {
        Self {
            node_id,
            keypair,
            peers: Vec::new(),
            inbox: VecDeque::new(),
            outbox: VecDeque::new(),
            clock: 0,
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn public_key(&self) -> NodePublicKey {
        self.keypair.public_key()
    }

    /// Sign arbitrary bytes with this node's key. The epoch protocol uses
    /// this for output records riding inside envelopes.
    pub fn sign(&self, message: &[u8]) -> NodeSignature {
        self.keypair.sign(message)
    }

    pub fn peers(&self) -> &[PeerEntry] {
        &self.peers
    }

    /// Advance the logical clock stamped onto outbound envelopes.
    pub fn tick(&mut self) {
        self.clock += 1;
    }

    // =========================================================================
    // ROSTER
    // =========================================================================

    /// Add or refresh a peer.
    pub fn add_peer(&mut self, node_id: NodeId, public_key: NodePublicKey) -> Result<(), WireError> {
        if let Some(entry) = self.peers.iter_mut().find(|p| p.node_id == node_id) {
            entry.public_key = public_key;
            entry.is_active = true;
            return Ok(());
        }

        if self.peers.len() >= MAX_WIRE_PEERS {
            return Err(WireError::TooManyPeers {
                capacity: MAX_WIRE_PEERS,
            });
        }

        self.peers.push(PeerEntry {
            node_id,
            public_key,
            is_active: true,
            last_seen: 0,
        });
        Ok(())
    }

    pub fn set_peer_active(&mut self, node_id: NodeId, is_active: bool) {
        if let Some(entry) = self.peers.iter_mut().find(|p| p.node_id == node_id) {
            entry.is_active = is_active;
        }
    }

    // =========================================================================
    // SENDING
    // =========================================================================

    /// Sign and queue a unicast envelope.
    pub fn send_message(
        &mut self,
        to: NodeId,
        kind: MessageKind,
        payload: &[u8],
    ) -> Result<(), WireError> {
        if payload.len() > MAX_PAYLOAD {
            return Err(WireError::PayloadTooLarge {
                actual: payload.len(),
                limit: MAX_PAYLOAD,
            });
        }

        let reachable = self
            .peers
            .iter()
            .any(|p| p.node_id == to && p.is_active);
        if !reachable {
            return Err(WireError::PeerUnreachable { node_id: to });
        }

        let mut envelope = Envelope::new(self.node_id, to, kind, self.clock, payload.to_vec())?;
        let signature = self.keypair.sign(&envelope.signing_bytes());
        envelope.signature = *signature.as_bytes();

        self.outbox.push_back(envelope);
        Ok(())
    }

    /// Send to every active peer except self. Partial success counts:
    /// the broadcast succeeds if at least one peer accepted.
    pub fn broadcast(&mut self, kind: MessageKind, payload: &[u8]) -> Result<usize, WireError> {
        let targets: Vec<NodeId> = self
            .peers
            .iter()
            .filter(|p| p.is_active && p.node_id != self.node_id)
            .map(|p| p.node_id)
            .collect();

        let mut delivered = 0;
        for target in targets {
            match self.send_message(target, kind, payload) {
                Ok(()) => delivered += 1,
                Err(err) => debug!(target, %err, "broadcast leg skipped"),
            }
        }

        if delivered == 0 {
            return Err(WireError::NoActivePeers);
        }
        Ok(delivered)
    }

    /// Wire-level liveness probe.
    pub fn send_heartbeat(&mut self) -> Result<usize, WireError> {
        self.broadcast(MessageKind::Heartbeat, &[0u8; 8])
    }

    // =========================================================================
    // QUEUES
    // =========================================================================

    /// Envelopes awaiting transport.
    pub fn drain_outbox(&mut self) -> Vec<Envelope> {
        self.outbox.drain(..).collect()
    }

    /// Transport-side entry point for an inbound envelope.
    pub fn deliver(&mut self, envelope: Envelope) {
        self.inbox.push_back(envelope);
    }

    /// Pop the next verified envelope, discarding any whose signature does
    /// not check out against the roster.
    pub fn receive(&mut self) -> Option<Envelope> {
        while let Some(envelope) = self.inbox.pop_front() {
            if self.verify(&envelope) {
                let clock = self.clock;
                if let Some(entry) = self
                    .peers
                    .iter_mut()
                    .find(|p| p.node_id == envelope.from)
                {
                    entry.last_seen = clock;
                }
                return Some(envelope);
            }
            warn!(from = envelope.from, "dropping envelope with bad signature");
        }
        None
    }

    /// Check an envelope's signature against the sender's roster key.
    pub fn verify(&self, envelope: &Envelope) -> bool {
        let Some(entry) = self.peers.iter().find(|p| p.node_id == envelope.from) else {
            return false;
        };

        let signature = NodeSignature::from_bytes(envelope.signature);
        entry
            .public_key
            .verify(&envelope.signing_bytes(), &signature)
            .is_ok()
    }
}
