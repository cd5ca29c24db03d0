//! # Consensus Link
//!
//! Pumps Raft RPCs through the wire layer and dispatches every inbound
//! envelope to its handler. One call to [`SettlementCluster::elect_leader`]
//! is one cooperative-loop step: tick Raft, move its traffic, drain the
//! inbox, reconcile the roster with the elected leader.

use crate::cluster::SettlementCluster;
use crate::domain::errors::ClusterError;
use crate::domain::payloads::{
    DagNodePayload, EpochSyncPayload, RequestDagNodePayload, SortedTxsPayload, SyncRootPayload,
    TxSetBroadcastPayload, TxSetSignaturePayload,
};
use shared_types::{EpochOutput, NodeId, TxSortInfo};
use tracing::{debug, info, warn};
use ts_04_consensus::{RaftMessage, RaftRpc};
use ts_05_wire::{Envelope, MessageKind};

fn raft_kind(rpc: &RaftRpc) -> MessageKind {
    match rpc {
        RaftRpc::RequestVote { .. } => MessageKind::RaftRequestVote,
        RaftRpc::VoteResponse { .. } => MessageKind::RaftRequestVoteResponse,
        RaftRpc::AppendEntries { .. } => MessageKind::RaftAppendEntries,
        RaftRpc::AppendResponse { .. } => MessageKind::RaftAppendEntriesResponse,
    }
}

impl SettlementCluster {
    /// One Raft tick with network I/O, then reconcile leadership flags.
    pub fn elect_leader(&mut self) -> Result<(), ClusterError> {
        self.clock += 1;
        self.network.tick();

        let outbound = self.raft.tick();
        self.send_raft_batch(outbound);
        self.process_inbox();
        self.reconcile_leader();
        Ok(())
    }

    pub(crate) fn reconcile_leader(&mut self) {
        let leader = self.raft.leader();
        if leader != self.current_leader {
            self.current_leader = leader;
            for node in &mut self.nodes {
                node.is_leader = leader == Some(node.node_id);
            }
            info!(node = self.node_id, ?leader, "leader changed");
        }
    }

    pub(crate) fn send_raft_batch(&mut self, messages: Vec<RaftMessage>) {
        for message in messages {
            let kind = raft_kind(&message.rpc);
            let bytes = match bincode::serialize(&message) {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(%err, "raft message encode failed");
                    continue;
                }
            };
            // Dropped messages are fine; Raft retries on the next tick.
            if let Err(err) = self.network.send_message(message.to, kind, &bytes) {
                debug!(to = message.to, %err, "raft message dropped");
            }
        }
    }

    // =========================================================================
    // TRANSPORT HOOKUP
    // =========================================================================

    /// Signed envelopes awaiting the host transport.
    pub fn drain_outbound(&mut self) -> Vec<Envelope> {
        self.network.drain_outbox()
    }

    /// Transport-side entry for one inbound envelope.
    pub fn deliver(&mut self, envelope: Envelope) {
        self.network.deliver(envelope);
    }

    // =========================================================================
    // INBOX DISPATCH
    // =========================================================================

    /// Drain and dispatch every verified envelope in the inbox.
    pub fn process_inbox(&mut self) {
        while let Some(envelope) = self.network.receive() {
            self.dispatch(envelope);
        }
        self.retry_pending_remote();
    }

    fn dispatch(&mut self, envelope: Envelope) {
        let from = envelope.from;
        match envelope.kind {
            MessageKind::Heartbeat => self.note_heartbeat(from),

            MessageKind::RaftRequestVote
            | MessageKind::RaftRequestVoteResponse
            | MessageKind::RaftAppendEntries
            | MessageKind::RaftAppendEntriesResponse => {
                match bincode::deserialize::<RaftMessage>(&envelope.payload) {
                    Ok(message) => {
                        let responses = self.raft.handle_message(&message);
                        self.send_raft_batch(responses);
                        self.reconcile_leader();
                    }
                    Err(err) => warn!(from, %err, "undecodable raft payload"),
                }
            }

            MessageKind::SortedTxs => {
                match bincode::deserialize::<SortedTxsPayload>(&envelope.payload) {
                    Ok(payload) => self.handle_sorted_txs(payload),
                    Err(err) => warn!(from, %err, "undecodable sorted-tx payload"),
                }
            }

            MessageKind::DagNode | MessageKind::DagNodeResponse => {
                match bincode::deserialize::<DagNodePayload>(&envelope.payload) {
                    Ok(payload) => self.handle_dag_node(payload),
                    Err(err) => warn!(from, %err, "undecodable dag-node payload"),
                }
            }

            MessageKind::RequestDagNode => {
                match bincode::deserialize::<RequestDagNodePayload>(&envelope.payload) {
                    Ok(payload) => self.handle_request_dag_node(from, payload),
                    Err(err) => warn!(from, %err, "undecodable dag request"),
                }
            }

            MessageKind::TxSetBroadcast => {
                match bincode::deserialize::<TxSetBroadcastPayload>(&envelope.payload) {
                    Ok(payload) => self.handle_tx_set_broadcast(from, payload),
                    Err(err) => warn!(from, %err, "undecodable tx set"),
                }
            }

            MessageKind::TxSetSignature => {
                match bincode::deserialize::<TxSetSignaturePayload>(&envelope.payload) {
                    Ok(payload) => {
                        if !self
                            .tx_set_signatures
                            .iter()
                            .any(|(node, _)| *node == payload.node_id)
                        {
                            self.tx_set_signatures
                                .push((payload.node_id, payload.signature));
                        }
                    }
                    Err(err) => warn!(from, %err, "undecodable tx-set signature"),
                }
            }

            MessageKind::EpochOutput => {
                match bincode::deserialize::<EpochOutput>(&envelope.payload) {
                    Ok(output) => self.handle_epoch_output(from, output),
                    Err(err) => warn!(from, %err, "undecodable epoch output"),
                }
            }

            MessageKind::EpochSyncToL2 => {
                match bincode::deserialize::<EpochSyncPayload>(&envelope.payload) {
                    Ok(payload) => {
                        info!(epoch = payload.epoch_id, "ratified triple received");
                        self.last_ratified = Some(payload);
                    }
                    Err(err) => warn!(from, %err, "undecodable L2 sync payload"),
                }
            }

            MessageKind::SyncRequest => {
                match bincode::deserialize::<SyncRootPayload>(&envelope.payload) {
                    Ok(payload) => self.handle_sync_request(from, payload),
                    Err(err) => warn!(from, %err, "undecodable sync request"),
                }
            }

            MessageKind::SyncResponse => {
                match bincode::deserialize::<SyncRootPayload>(&envelope.payload) {
                    Ok(payload) => {
                        if payload.dag_root != self.dag.compute_root_hash() {
                            self.sync_dag(payload.chain_id);
                        }
                    }
                    Err(err) => warn!(from, %err, "undecodable sync response"),
                }
            }

            MessageKind::LeaderElection => {
                // Leadership rides the Raft kinds; this tag is reserved.
                debug!(from, "ignoring legacy leader-election message");
            }
        }
    }

    fn note_heartbeat(&mut self, from: NodeId) {
        let clock = self.clock;
        if let Some(node) = self.nodes.iter_mut().find(|n| n.node_id == from) {
            node.last_heartbeat = clock;
        }
    }

    fn handle_sorted_txs(&mut self, payload: SortedTxsPayload) {
        let infos: Vec<TxSortInfo> = payload
            .txs
            .iter()
            .enumerate()
            .map(|(i, tx)| TxSortInfo {
                tx_id: tx.tx_id,
                sort_order: payload.base_order + i as u64,
                sort_timestamp: tx.timestamp,
            })
            .collect();
        if let Err(err) = self.set_tx_sort_info(&infos) {
            warn!(%err, "sort info rejected");
            return;
        }

        for tx in payload.txs {
            if !self.sorted_txs.iter().any(|t| t.tx_id == tx.tx_id) {
                self.sorted_txs.push(tx);
            }
        }
    }

    fn handle_tx_set_broadcast(&mut self, from: NodeId, payload: TxSetBroadcastPayload) {
        match self.receive_and_sign_tx_set(&payload.txs) {
            Ok(signature) => {
                let reply = TxSetSignaturePayload {
                    epoch_id: payload.epoch_id,
                    node_id: self.node_id,
                    signature: *signature.as_bytes(),
                };
                match bincode::serialize(&reply) {
                    Ok(bytes) => {
                        if let Err(err) =
                            self.network
                                .send_message(from, MessageKind::TxSetSignature, &bytes)
                        {
                            debug!(to = from, %err, "tx-set signature not delivered");
                        }
                    }
                    Err(err) => warn!(%err, "tx-set signature encode failed"),
                }
            }
            Err(err) => warn!(from, %err, "refusing to countersign tx set"),
        }
    }

    fn handle_epoch_output(&mut self, from: NodeId, output: EpochOutput) {
        // The output record carries its own signature; check it against
        // the sender's roster key before accepting.
        let Some(node) = self.nodes.iter().find(|n| n.node_id == output.node_id) else {
            warn!(from, node = output.node_id, "epoch output from unknown node");
            return;
        };
        let Ok(key) = shared_crypto::NodePublicKey::from_bytes(node.public_key) else {
            warn!(node = output.node_id, "roster key invalid");
            return;
        };
        let signature = shared_crypto::NodeSignature::from_bytes(output.signature);
        if key.verify(&output.signing_bytes(), &signature).is_err() {
            warn!(node = output.node_id, "epoch output signature invalid");
            return;
        }

        if output.epoch_id != self.current_epoch {
            debug!(
                node = output.node_id,
                epoch = output.epoch_id,
                "epoch output for another epoch"
            );
            return;
        }

        self.accept_epoch_output(output);
    }

    fn handle_sync_request(&mut self, from: NodeId, payload: SyncRootPayload) {
        let reply = SyncRootPayload {
            chain_id: payload.chain_id,
            dag_root: self.dag.compute_root_hash(),
        };
        match bincode::serialize(&reply) {
            Ok(bytes) => {
                if let Err(err) = self
                    .network
                    .send_message(from, MessageKind::SyncResponse, &bytes)
                {
                    debug!(to = from, %err, "sync response not delivered");
                }
            }
            Err(err) => warn!(%err, "sync response encode failed"),
        }
    }
}
