//! # In-Process Cluster Harness
//!
//! N replica handles wired through the host mediator. Each step runs one
//! cooperative-loop iteration per node and moves every outbound envelope
//! through the mediated channel to its destination inbox.

use shared_crypto::{NodeKeypair, SeededEntropy};
use shared_types::NodeId;
use tracing::warn;
use ts_05_wire::Envelope;
use ts_06_cluster::SettlementCluster;
use ts_08_enclave_channel::{ChannelKind, GuestChannel, GuestEndpoint, HostMediator};

/// A deterministic in-process cluster of settlement replicas.
pub struct ClusterHarness {
    pub nodes: Vec<SettlementCluster>,
    endpoints: Vec<GuestEndpoint>,
    #[allow(dead_code)]
    mediator: HostMediator,
}

impl ClusterHarness {
    /// Build `count` replicas with ids `1..=count`, fully meshed: every
    /// roster knows every key, every guest is registered with the
    /// mediator.
    pub fn new(count: usize, seed: u64) -> Self {
        let keypairs: Vec<NodeKeypair> = (0..count)
            .map(|i| NodeKeypair::from_seed([seed as u8 ^ (i as u8 + 1); 32]))
            .collect();
        let public_keys: Vec<_> = keypairs.iter().map(|k| k.public_key()).collect();

        let mut nodes = Vec::with_capacity(count);
        for (i, keypair) in keypairs.into_iter().enumerate() {
            let node_id = (i + 1) as NodeId;
            let mut cluster = SettlementCluster::new(
                node_id,
                keypair,
                Box::new(SeededEntropy::new(seed.wrapping_mul(31).wrapping_add(i as u64 * 17))),
                Box::new(SeededEntropy::new(seed.wrapping_mul(67).wrapping_add(i as u64))),
            );
            for (j, public_key) in public_keys.iter().enumerate() {
                let peer_id = (j + 1) as NodeId;
                if peer_id != node_id {
                    let quote = shared_crypto::attestation_quote(public_key);
                    cluster
                        .register_node(peer_id, *public_key, quote)
                        .expect("roster capacity");
                }
            }
            nodes.push(cluster);
        }

        let mediator = HostMediator::new();
        let endpoints = (1..=count)
            .map(|id| {
                mediator
                    .register_guest(id as NodeId, ChannelKind::HostMediated)
                    .expect("fresh mediator")
            })
            .collect();

        Self {
            nodes,
            endpoints,
            mediator,
        }
    }

    /// One cooperative-loop iteration on every node, then full message
    /// routing until the channels drain.
    pub fn step(&mut self) {
        for node in &mut self.nodes {
            node.elect_leader().expect("tick");
        }
        self.route();
    }

    /// Move outbound envelopes through the mediator into destination
    /// inboxes, then let every node drain what arrived. Repeats until no
    /// traffic remains so request/response pairs settle within one call.
    pub fn route(&mut self) {
        loop {
            let mut moved = false;

            for (i, node) in self.nodes.iter_mut().enumerate() {
                for envelope in node.drain_outbound() {
                    let frame = envelope.encode();
                    if self.endpoints[i].send(envelope.to, &frame).is_err() {
                        warn!(to = envelope.to, "no inbox for destination");
                        continue;
                    }
                    moved = true;
                }
            }

            for (i, endpoint) in self.endpoints.iter().enumerate() {
                while let Some((frame, _src)) = endpoint.receive() {
                    match Envelope::decode(&frame) {
                        Ok(envelope) => self.nodes[i].deliver(envelope),
                        Err(err) => warn!(%err, "dropping undecodable frame"),
                    }
                    moved = true;
                }
            }

            for node in &mut self.nodes {
                node.process_inbox();
            }

            if !moved {
                break;
            }
        }
    }

    /// Step until some node is leader; returns its id.
    pub fn run_until_leader(&mut self, max_steps: usize) -> Option<NodeId> {
        for _ in 0..max_steps {
            self.step();
            if let Some(id) = self.leader_id() {
                return Some(id);
            }
        }
        None
    }

    pub fn leader_id(&self) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|n| n.is_leader())
            .map(|n| n.node_id())
    }

    pub fn leader_index(&self) -> Option<usize> {
        self.nodes.iter().position(|n| n.is_leader())
    }

    pub fn step_n(&mut self, count: usize) {
        for _ in 0..count {
            self.step();
        }
    }
}
