//! # DAG and L2 Synchronization
//!
//! Node exchange between replicas (push, request, periodic broadcast,
//! whole-DAG reconciliation) and the wrappers over the L2 full node.

use crate::cluster::SettlementCluster;
use crate::domain::errors::ClusterError;
use crate::domain::payloads::{DagNodePayload, RequestDagNodePayload};
use shared_types::{AccountAddress, Amount, ChainId, Operation, TokenAddress};
use tracing::{debug, warn};
use ts_03_merkle_dag::{DagError, DagNodeRecord, NodeIdx};
use ts_05_wire::MessageKind;
use ts_07_l2_sync::{L2LogEntry, LogExistenceProof};

impl SettlementCluster {
    // =========================================================================
    // DAG NODE EXCHANGE
    // =========================================================================

    /// Push one node to every peer and re-queue it for the periodic
    /// round.
    pub fn broadcast_dag_node(&mut self, chain_id: ChainId, node_id: u64) -> Result<(), ClusterError> {
        let idx = self
            .dag
            .idx_of(node_id)
            .ok_or(ClusterError::InputInvalid("unknown dag node"))?;
        self.dag.note_latest(idx);
        self.push_node_to_peers(chain_id, idx)
    }

    /// Drain the latest-nodes buffer into a broadcast round.
    pub fn periodic_broadcast(&mut self) -> Result<usize, ClusterError> {
        let latest = self.dag.drain_latest();
        for idx in &latest {
            self.push_node_to_peers(0, *idx)?;
        }
        Ok(latest.len())
    }

    fn push_node_to_peers(&mut self, chain_id: ChainId, idx: NodeIdx) -> Result<(), ClusterError> {
        let payload = DagNodePayload {
            chain_id,
            record: self.dag.record(idx),
        };
        let bytes = bincode::serialize(&payload)
            .map_err(|_| ClusterError::InputInvalid("dag node encode failed"))?;
        if let Err(err) = self.network.broadcast(MessageKind::DagNode, &bytes) {
            debug!(node_id = payload.record.node_id, %err, "dag node broadcast had no takers");
        }
        Ok(())
    }

    /// Ask the cluster for a node we do not hold. Returns false when the
    /// node is already local and no request went out.
    pub fn request_dag_node(&mut self, chain_id: ChainId, node_id: u64) -> Result<bool, ClusterError> {
        if self.dag.contains(node_id) {
            return Ok(false);
        }

        let payload = RequestDagNodePayload { chain_id, node_id };
        let bytes = bincode::serialize(&payload)
            .map_err(|_| ClusterError::InputInvalid("dag request encode failed"))?;
        if let Err(err) = self.network.broadcast(MessageKind::RequestDagNode, &bytes) {
            debug!(node_id, %err, "dag request had no takers");
        }
        self.missing_nodes.insert(node_id);
        Ok(true)
    }

    /// Re-issue requests for everything still missing. Called whenever a
    /// remote root mismatch is observed; requests repeat until the nodes
    /// arrive.
    pub fn sync_dag(&mut self, chain_id: ChainId) {
        let missing: Vec<u64> = self.missing_nodes.iter().copied().collect();
        for node_id in missing {
            if let Err(err) = self.request_dag_node(chain_id, node_id) {
                warn!(node_id, %err, "dag request failed");
            }
        }
    }

    /// Inbound node push: insert when its parents are local, otherwise
    /// park it and request the missing ancestry.
    pub(crate) fn handle_dag_node(&mut self, payload: DagNodePayload) {
        let record = payload.record;
        match self.dag.insert_remote(&record) {
            Ok(_) => {
                self.missing_nodes.remove(&record.node_id);
                self.retry_pending_remote();
            }
            Err(DagError::MissingParents { .. }) => {
                let missing: Vec<u64> = record
                    .parent_ids
                    .iter()
                    .filter(|id| !self.dag.contains(**id))
                    .copied()
                    .collect();
                for parent_id in missing {
                    if let Err(err) = self.request_dag_node(payload.chain_id, parent_id) {
                        warn!(parent_id, %err, "parent request failed");
                    }
                }
                if !self
                    .pending_remote
                    .iter()
                    .any(|r| r.node_id == record.node_id)
                {
                    self.pending_remote.push(record);
                }
            }
            Err(err) => debug!(node_id = record.node_id, %err, "remote node refused"),
        }
    }

    /// Serve a peer's request for one of our nodes.
    pub(crate) fn handle_request_dag_node(&mut self, from: u32, payload: RequestDagNodePayload) {
        let Some(idx) = self.dag.idx_of(payload.node_id) else {
            debug!(node_id = payload.node_id, "requested node not held");
            return;
        };

        let reply = DagNodePayload {
            chain_id: payload.chain_id,
            record: self.dag.record(idx),
        };
        match bincode::serialize(&reply) {
            Ok(bytes) => {
                if let Err(err) =
                    self.network
                        .send_message(from, MessageKind::DagNodeResponse, &bytes)
                {
                    debug!(to = from, %err, "dag response not delivered");
                }
            }
            Err(err) => warn!(%err, "dag response encode failed"),
        }
    }

    /// Retry parked remote records until no further insert succeeds.
    pub(crate) fn retry_pending_remote(&mut self) {
        let mut progressed = true;
        while progressed {
            progressed = false;
            let mut still_pending = Vec::with_capacity(self.pending_remote.len());
            for record in std::mem::take(&mut self.pending_remote) {
                match self.dag.insert_remote(&record) {
                    Ok(_) => {
                        self.missing_nodes.remove(&record.node_id);
                        progressed = true;
                    }
                    Err(DagError::MissingParents { .. }) => still_pending.push(record),
                    Err(err) => {
                        debug!(node_id = record.node_id, %err, "parked node dropped");
                    }
                }
            }
            self.pending_remote = still_pending;
        }
    }

    /// Insert one node received from another replica, refusing it until
    /// every parent is local.
    pub fn sync_node_from_other_tee(
        &mut self,
        record: &DagNodeRecord,
    ) -> Result<NodeIdx, ClusterError> {
        self.dag.insert_remote(record).map_err(Into::into)
    }

    /// Reconcile this DAG with a remote replica's: early-exit on equal
    /// roots, otherwise a fixed-point pass bounded by the remote node
    /// count, inserting whatever has its parents locally.
    pub fn sync_all_tee_dags(&mut self, remote: &SettlementCluster) -> Result<usize, ClusterError> {
        if self.dag.compute_root_hash() == remote.dag.compute_root_hash() {
            return Ok(0);
        }

        let remote_records: Vec<DagNodeRecord> = remote
            .dag
            .nodes()
            .map(|(idx, _)| remote.dag.record(idx))
            .collect();

        let mut inserted = 0;
        let mut changed = true;
        let mut rounds = 0;
        while changed && rounds <= remote_records.len() {
            changed = false;
            rounds += 1;

            for record in &remote_records {
                if self.dag.contains(record.node_id) {
                    continue;
                }
                if !record.parent_ids.iter().all(|id| self.dag.contains(*id)) {
                    continue;
                }
                if self.dag.insert_remote(record).is_ok() {
                    inserted += 1;
                    changed = true;
                }
            }
        }

        Ok(inserted)
    }

    // =========================================================================
    // L2 BOUNDARY
    // =========================================================================

    /// Pull L2 headers into the full-node store.
    pub fn sync_l2_block_headers(
        &mut self,
        chain_id: ChainId,
        from_block: u64,
        to_block: u64,
    ) -> Result<(), ClusterError> {
        self.l2_node
            .sync_block_headers(chain_id, from_block, to_block)
            .map_err(|_| ClusterError::InputInvalid("header sync refused"))
    }

    /// Replay one log-existence proof.
    pub fn verify_log_existence(&self, log: &L2LogEntry, proof: &LogExistenceProof) -> bool {
        self.l2_node.verify_log_existence(log, proof)
    }

    /// Verify a batch with work spread round-robin over the roster.
    pub fn distributed_verify_logs(
        &mut self,
        logs: &[L2LogEntry],
        proofs: &[LogExistenceProof],
    ) -> Vec<(bool, u32)> {
        let node_count = self.nodes.len() as u32;
        self.l2_node.distributed_verify_logs(logs, proofs, node_count)
    }

    /// Verify a log and extract the operation it encodes: token from the
    /// first topic, account from the second, amount from the data word,
    /// debit when a third topic is present.
    pub fn process_log_with_verification(
        &mut self,
        chain_id: ChainId,
        log: &L2LogEntry,
        proof: &LogExistenceProof,
    ) -> Result<Operation, ClusterError> {
        if log.chain_id != chain_id {
            return Err(ClusterError::InputInvalid("log from another chain"));
        }
        if !self.verify_log_existence(log, proof) {
            return Err(ClusterError::InputInvalid("log existence unproven"));
        }

        let mut tx_id_bytes = [0u8; 8];
        tx_id_bytes.copy_from_slice(&log.tx_hash[0..8]);
        let tx_id = u64::from_le_bytes(tx_id_bytes);
        let operation_id = tx_id.wrapping_add(log.log_index as u64);

        let mut token = TokenAddress([0u8; 42]);
        if let Some(topic) = log.topics.first() {
            token.0[..32].copy_from_slice(topic);
        }

        let mut account = AccountAddress([0u8; 20]);
        if let Some(topic) = log.topics.get(1) {
            account.0.copy_from_slice(&topic[..20]);
        }

        let mut amount = Amount::ZERO;
        if log.data.len() >= 32 {
            amount.0.copy_from_slice(&log.data[..32]);
        }

        let kind = if log.topics.len() >= 3 {
            shared_types::OpKind::Subtract
        } else {
            shared_types::OpKind::Add
        };

        Ok(Operation::new(
            operation_id,
            tx_id,
            log.block_number * 2,
            kind,
            token,
            account,
            amount,
        ))
    }
}
