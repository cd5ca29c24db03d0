//! # Settlement Cluster
//!
//! One replica's coordinator state and the epoch protocol. Leadership is
//! Raft's; the coordinator reconciles its roster with the elected leader
//! and gates sorting, tx-set broadcast, output collection and L2 sync on
//! it.

use crate::domain::entities::TeeNodeInfo;
use crate::domain::errors::ClusterError;
use crate::domain::payloads::{EpochSyncPayload, SortedTxsPayload, TxSetBroadcastPayload};
use shared_crypto::{sha256, EntropySource, NodeKeypair, NodePublicKey, NodeSignature, Sha256Hasher};
use shared_types::{
    balance_key, Amount, ChainId, EpochId, EpochOutput, ExecutedTx, Hash32, NodeId, Operation,
    TokenAddress, TxId, TxRequest, TxSortInfo, ZERO_HASH,
};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};
use ts_01_state_trie::PatriciaTrie;
use ts_03_merkle_dag::{DagNodeRecord, MerkleDag};
use ts_04_consensus::{LogEntry, Raft};
use ts_05_wire::{MessageKind, WireNetwork};
use ts_07_l2_sync::L2FullNode;

/// Roster capacity.
pub const MAX_CLUSTER_NODES: usize = 16;

/// Pending/sorted/executed queue capacity.
pub const MAX_PENDING_TXS: usize = 10_000;

/// Per-token trie capacity.
pub const MAX_CLUSTER_TOKENS: usize = 16;

/// Sorted transactions carried per broadcast envelope.
pub const SORTED_TXS_PER_ENVELOPE: usize = 16;

/// Executed-tx records carried per broadcast envelope.
pub const TX_SET_PER_ENVELOPE: usize = 100;

/// One settlement replica.
pub struct SettlementCluster {
    pub(crate) node_id: NodeId,
    pub(crate) nodes: Vec<TeeNodeInfo>,
    pub(crate) current_leader: Option<NodeId>,

    pub(crate) pending_txs: Vec<TxRequest>,
    pub(crate) sorted_txs: Vec<TxRequest>,
    pub(crate) tx_sort_map: HashMap<TxId, TxSortInfo>,
    pub(crate) executed_txs: Vec<ExecutedTx>,

    /// `(chain_id ‖ token) → deploy tx hash`.
    pub(crate) token_registry: PatriciaTrie,
    /// Insertion order is part of the state-root commitment.
    pub(crate) token_tries: Vec<(TokenAddress, PatriciaTrie)>,

    pub(crate) dag: MerkleDag,
    pub(crate) raft: Raft,
    pub(crate) network: WireNetwork,
    pub(crate) sort_entropy: Box<dyn EntropySource>,
    pub(crate) l2_node: L2FullNode,

    pub(crate) current_epoch: EpochId,
    pub(crate) epoch_in_progress: bool,
    pub(crate) epoch_outputs: Vec<EpochOutput>,
    pub(crate) epoch_output_collected: bool,
    pub(crate) tx_set_signatures: Vec<(NodeId, [u8; 64])>,
    pub(crate) last_ratified: Option<EpochSyncPayload>,

    /// Node ids we know exist remotely but do not hold yet.
    pub(crate) missing_nodes: HashSet<u64>,
    /// Remote records parked until their parents arrive.
    pub(crate) pending_remote: Vec<DagNodeRecord>,

    pub(crate) clock: u64,
}

impl SettlementCluster {
    /// Build a replica. Election and sort tie-breaking draw from separate
    /// entropy sources so tests can pin either independently.
    pub fn new(
        node_id: NodeId,
        keypair: NodeKeypair,
        election_entropy: Box<dyn EntropySource>,
        sort_entropy: Box<dyn EntropySource>,
    ) -> Self {
        let public_key = keypair.public_key();
        let quote = shared_crypto::attestation_quote(&public_key);
        let network = WireNetwork::new(node_id, keypair);

        Self {
            node_id,
            nodes: vec![TeeNodeInfo::new(node_id, *public_key.as_bytes(), quote)],
            current_leader: None,
            pending_txs: Vec::new(),
            sorted_txs: Vec::new(),
            tx_sort_map: HashMap::new(),
            executed_txs: Vec::new(),
            token_registry: PatriciaTrie::new(),
            token_tries: Vec::new(),
            dag: MerkleDag::new(),
            raft: Raft::new(node_id, election_entropy),
            network,
            sort_entropy,
            l2_node: L2FullNode::new(),
            current_epoch: 0,
            epoch_in_progress: false,
            epoch_outputs: Vec::new(),
            epoch_output_collected: false,
            tx_set_signatures: Vec::new(),
            last_ratified: None,
            missing_nodes: HashSet::new(),
            pending_remote: Vec::new(),
            clock: 0,
        }
    }

    // =========================================================================
    // READ SURFACE
    // =========================================================================

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn nodes(&self) -> &[TeeNodeInfo] {
        &self.nodes
    }

    pub fn current_leader(&self) -> Option<NodeId> {
        self.current_leader
    }

    pub fn is_leader(&self) -> bool {
        self.raft.is_leader()
    }

    pub fn dag(&self) -> &MerkleDag {
        &self.dag
    }

    pub fn raft(&self) -> &Raft {
        &self.raft
    }

    pub fn l2_node(&self) -> &L2FullNode {
        &self.l2_node
    }

    pub fn pending_count(&self) -> usize {
        self.pending_txs.len()
    }

    pub fn sorted_count(&self) -> usize {
        self.sorted_txs.len()
    }

    pub fn epoch_output_collected(&self) -> bool {
        self.epoch_output_collected
    }

    pub fn epoch_outputs(&self) -> &[EpochOutput] {
        &self.epoch_outputs
    }

    pub fn last_ratified(&self) -> Option<&EpochSyncPayload> {
        self.last_ratified.as_ref()
    }

    pub fn tx_set_signatures(&self) -> &[(NodeId, [u8; 64])] {
        &self.tx_set_signatures
    }

    pub(crate) fn majority(&self) -> usize {
        self.nodes.len() / 2 + 1
    }

    /// Balance of `(account, token)` in the live trie; zero when absent.
    pub fn balance(
        &self,
        token: &TokenAddress,
        account: &shared_types::AccountAddress,
    ) -> Amount {
        let key = balance_key(account, token);
        self.token_tries
            .iter()
            .find(|(addr, _)| addr == token)
            .and_then(|(_, trie)| trie.get(&key))
            .and_then(|bytes| <[u8; 32]>::try_from(bytes).ok())
            .map(Amount)
            .unwrap_or(Amount::ZERO)
    }

    /// Root of one token's balance trie.
    pub fn token_root(&self, token: &TokenAddress) -> Option<Hash32> {
        self.token_tries
            .iter()
            .find(|(addr, _)| addr == token)
            .map(|(_, trie)| trie.root_hash())
    }

    /// Root of the token-registry trie.
    pub fn token_registry_root(&self) -> Hash32 {
        self.token_registry.root_hash()
    }

    // =========================================================================
    // ROSTER AND TOKENS
    // =========================================================================

    /// Register a peer replica: roster entry, wire key, Raft membership.
    pub fn register_node(
        &mut self,
        node_id: NodeId,
        public_key: NodePublicKey,
        enclave_quote: Vec<u8>,
    ) -> Result<(), ClusterError> {
        if let Some(existing) = self.nodes.iter_mut().find(|n| n.node_id == node_id) {
            existing.public_key = *public_key.as_bytes();
            existing.enclave_quote = enclave_quote;
            existing.is_active = true;
            return Ok(());
        }
        if self.nodes.len() >= MAX_CLUSTER_NODES {
            return Err(ClusterError::CapacityExceeded { what: "roster" });
        }

        self.nodes
            .push(TeeNodeInfo::new(node_id, *public_key.as_bytes(), enclave_quote));
        if node_id != self.node_id {
            self.network.add_peer(node_id, public_key)?;
            self.raft.add_peer(node_id)?;
        }
        Ok(())
    }

    /// Mark a peer reachable or partitioned across the roster, the wire
    /// layer and Raft at once.
    pub fn set_peer_active(&mut self, node_id: NodeId, is_active: bool) {
        if let Some(node) = self.nodes.iter_mut().find(|n| n.node_id == node_id) {
            node.is_active = is_active;
        }
        self.network.set_peer_active(node_id, is_active);
        self.raft.set_peer_active(node_id, is_active);
    }

    /// Record a settled token: `(chain_id ‖ token) → deploy_hash` in the
    /// registry trie, plus a balance trie while capacity remains.
    pub fn register_token(
        &mut self,
        token: &TokenAddress,
        chain_id: ChainId,
        deploy_tx_hash: &Hash32,
    ) -> Result<(), ClusterError> {
        let mut key = Vec::with_capacity(4 + TokenAddress::LEN);
        key.extend_from_slice(&chain_id.to_le_bytes());
        key.extend_from_slice(&token.0);
        self.token_registry.insert(&key, deploy_tx_hash)?;

        if self.token_tries.iter().all(|(addr, _)| addr != token) {
            if self.token_tries.len() < MAX_CLUSTER_TOKENS {
                self.token_tries.push((*token, PatriciaTrie::new()));
            } else {
                warn!(?chain_id, "token list full, registry entry only");
            }
        }
        Ok(())
    }

    pub(crate) fn token_trie_index_or_create(
        &mut self,
        token: &TokenAddress,
    ) -> Result<usize, ClusterError> {
        if let Some(idx) = self.token_tries.iter().position(|(addr, _)| addr == token) {
            return Ok(idx);
        }
        if self.token_tries.len() >= MAX_CLUSTER_TOKENS {
            return Err(ClusterError::CapacityExceeded { what: "tokens" });
        }
        self.token_tries.push((*token, PatriciaTrie::new()));
        Ok(self.token_tries.len() - 1)
    }

    // =========================================================================
    // TRANSACTION INTAKE AND SORT
    // =========================================================================

    pub fn add_tx_request(&mut self, tx: TxRequest) -> Result<(), ClusterError> {
        if self.pending_txs.len() >= MAX_PENDING_TXS {
            return Err(ClusterError::CapacityExceeded { what: "pending txs" });
        }
        self.pending_txs.push(tx);
        Ok(())
    }

    /// Leader-only: order the pending queue by `(timestamp, entropy,
    /// tx_id)` and broadcast the result. The entropy key makes equal
    /// timestamps unpredictable; when the source fails, every key is zero
    /// and tx id decides.
    pub fn sort_txs(&mut self) -> Result<usize, ClusterError> {
        if !self.is_leader() {
            return Err(ClusterError::NotLeader);
        }

        let mut keyed: Vec<(TxRequest, u64)> = Vec::with_capacity(self.pending_txs.len());
        for tx in &self.pending_txs {
            let tie_break = self.sort_entropy.next_u64().unwrap_or(0);
            keyed.push((*tx, tie_break));
        }
        keyed.sort_by_key(|(tx, tie_break)| (tx.timestamp, *tie_break, tx.tx_id));

        self.sorted_txs = keyed
            .into_iter()
            .map(|(mut tx, _)| {
                tx.is_processed = true;
                tx
            })
            .collect();
        for tx in &mut self.pending_txs {
            tx.is_processed = true;
        }

        self.tx_sort_map.clear();
        for (order, tx) in self.sorted_txs.iter().enumerate() {
            self.tx_sort_map.insert(
                tx.tx_id,
                TxSortInfo {
                    tx_id: tx.tx_id,
                    sort_order: order as u64,
                    sort_timestamp: tx.timestamp,
                },
            );
        }

        // Distribute in chunks; partial delivery is fine, peers re-request
        // what they miss.
        for (chunk_index, chunk) in self.sorted_txs.chunks(SORTED_TXS_PER_ENVELOPE).enumerate() {
            let payload = SortedTxsPayload {
                epoch_id: self.current_epoch,
                base_order: (chunk_index * SORTED_TXS_PER_ENVELOPE) as u64,
                txs: chunk.to_vec(),
            };
            match bincode::serialize(&payload) {
                Ok(bytes) => {
                    if let Err(err) = self.network.broadcast(MessageKind::SortedTxs, &bytes) {
                        debug!(%err, "sorted-tx chunk broadcast skipped");
                    }
                }
                Err(err) => warn!(%err, "sorted-tx chunk encode failed"),
            }
        }

        info!(count = self.sorted_txs.len(), "transactions sorted");
        Ok(self.sorted_txs.len())
    }

    /// Merge sort positions distributed by the leader.
    pub fn set_tx_sort_info(&mut self, infos: &[TxSortInfo]) -> Result<(), ClusterError> {
        if self.tx_sort_map.len() + infos.len() > MAX_PENDING_TXS * 2 {
            return Err(ClusterError::CapacityExceeded { what: "sort map" });
        }
        for info in infos {
            self.tx_sort_map.insert(info.tx_id, *info);
        }
        Ok(())
    }

    pub fn get_tx_sort_order(&self, tx_id: TxId) -> Option<u64> {
        self.tx_sort_map.get(&tx_id).map(|info| info.sort_order)
    }

    pub(crate) fn resolve_sort_order(&self, tx_id: TxId) -> u64 {
        if let Some(info) = self.tx_sort_map.get(&tx_id) {
            return info.sort_order;
        }
        if let Some(position) = self.sorted_txs.iter().position(|tx| tx.tx_id == tx_id) {
            return position as u64;
        }
        // No leader order known: the tx id itself is the fallback key.
        tx_id
    }

    // =========================================================================
    // OPERATION INGEST
    // =========================================================================

    /// Ingest one operation: DAG insert at the resolved sort order, lazy
    /// parent application, then whole-transaction validation.
    pub fn process_operation(
        &mut self,
        chain_id: ChainId,
        op: &Operation,
    ) -> Result<(), ClusterError> {
        self.ingest_operation(chain_id, op)
    }

    /// Follower path for operations learned from a broadcast; identical
    /// mechanics, kept separate for call-site clarity.
    pub fn listen_and_build_dag(
        &mut self,
        chain_id: ChainId,
        op: &Operation,
    ) -> Result<(), ClusterError> {
        self.ingest_operation(chain_id, op)
    }

    fn ingest_operation(&mut self, _chain_id: ChainId, op: &Operation) -> Result<(), ClusterError> {
        let sort_order = self.resolve_sort_order(op.tx_id);
        let idx = self.dag.add_operation(op, sort_order)?;

        let trie_index = self.token_trie_index_or_create(&op.token)?;
        let (dag, tries) = (&mut self.dag, &mut self.token_tries);
        dag.update_parent_states(idx, &mut tries[trie_index].1)?;

        let valid = dag.validate_transaction(op.tx_id, &tries[trie_index].1);
        dag.mark_tx_failed(op.tx_id, !valid);
        if !valid {
            debug!(tx_id = op.tx_id, "transaction rejected");
            return Err(ClusterError::TxValidationFailed { tx_id: op.tx_id });
        }
        Ok(())
    }

    /// Serial fallback: apply one operation straight to its token trie,
    /// refusing debits that would underflow or touch a missing account.
    pub fn process_operation_serial(&mut self, op: &Operation) -> Result<(), ClusterError> {
        use primitive_types::U256;
        use shared_types::OpKind;

        let trie_index = self.token_trie_index_or_create(&op.token)?;
        let trie = &mut self.token_tries[trie_index].1;
        let key = balance_key(&op.account, &op.token);

        let new_balance = match trie.get(&key) {
            Some(bytes) => {
                let current = U256::from_big_endian(bytes);
                match op.kind {
                    OpKind::Add => current.overflowing_add(op.amount.to_u256()).0,
                    OpKind::Subtract => current
                        .checked_sub(op.amount.to_u256())
                        .ok_or(ClusterError::TxValidationFailed { tx_id: op.tx_id })?,
                    OpKind::Set => op.amount.to_u256(),
                }
            }
            None => match op.kind {
                OpKind::Add | OpKind::Set => op.amount.to_u256(),
                OpKind::Subtract => {
                    return Err(ClusterError::TxValidationFailed { tx_id: op.tx_id })
                }
            },
        };

        trie.insert(&key, Amount::from_u256(new_balance).as_bytes())?;
        Ok(())
    }

    /// Serial fallback over a batch: group consecutive operations by tx
    /// id, validate each group against the live trie, apply the groups
    /// that pass and skip the ones that do not.
    pub fn process_operations_serial_with_validation(
        &mut self,
        operations: &[Operation],
    ) -> Result<usize, ClusterError> {
        if operations.is_empty() {
            return Err(ClusterError::InputInvalid("empty operation batch"));
        }

        let mut applied = 0;
        let mut start = 0;
        while start < operations.len() {
            let tx_id = operations[start].tx_id;
            let mut end = start;
            while end < operations.len() && operations[end].tx_id == tx_id {
                end += 1;
            }
            let group = &operations[start..end];
            start = end;

            let trie_index = self.token_trie_index_or_create(&group[0].token)?;
            if !ts_03_merkle_dag::validate_tx(group, &self.token_tries[trie_index].1) {
                debug!(tx_id, "serial batch group rejected");
                continue;
            }

            for op in group {
                if self.process_operation_serial(op).is_err() {
                    warn!(tx_id, "serial apply stopped mid-group");
                    break;
                }
                applied += 1;
            }
        }
        Ok(applied)
    }

    // =========================================================================
    // EXECUTED TRANSACTIONS
    // =========================================================================

    /// Record (or refresh) an observed L2 confirmation.
    pub fn add_executed_tx(
        &mut self,
        tx_id: TxId,
        chain_id: ChainId,
        block_number: u64,
        log_index: u64,
    ) -> Result<(), ClusterError> {
        if let Some(existing) = self
            .executed_txs
            .iter_mut()
            .find(|t| t.tx_id == tx_id && t.chain_id == chain_id)
        {
            existing.block_number = block_number;
            existing.log_index = log_index;
            existing.has_log = true;
            return Ok(());
        }

        if self.executed_txs.len() >= MAX_PENDING_TXS {
            return Err(ClusterError::CapacityExceeded { what: "executed txs" });
        }
        self.executed_txs.push(ExecutedTx {
            tx_id,
            chain_id,
            block_number,
            log_index,
            has_log: true,
        });
        Ok(())
    }

    pub fn executed_txs(&self) -> &[ExecutedTx] {
        &self.executed_txs
    }

    /// Wire-level liveness probe to every active peer.
    pub fn send_heartbeat(&mut self) -> Result<usize, ClusterError> {
        self.network.send_heartbeat().map_err(Into::into)
    }

    // =========================================================================
    // EPOCHS
    // =========================================================================

    pub fn start_epoch(&mut self, epoch_id: EpochId) -> Result<(), ClusterError> {
        if self.epoch_in_progress {
            return Err(ClusterError::EpochInProgress);
        }
        self.raft.start_epoch(epoch_id)?;
        self.current_epoch = epoch_id;
        self.epoch_in_progress = true;
        self.epoch_outputs.clear();
        self.epoch_output_collected = false;
        self.tx_set_signatures.clear();
        Ok(())
    }

    pub fn end_epoch(&mut self) -> Result<(), ClusterError> {
        if !self.epoch_in_progress {
            return Err(ClusterError::EpochNotActive);
        }
        self.raft.end_epoch()?;
        self.epoch_in_progress = false;
        Ok(())
    }

    pub fn is_epoch_complete(&self) -> bool {
        self.raft.is_epoch_complete()
    }

    /// Leader-side proposal of a replicated log entry.
    pub fn raft_append(&mut self, entry: LogEntry) -> Result<u64, ClusterError> {
        self.raft.append_entry(entry).map_err(Into::into)
    }

    pub fn current_epoch(&self) -> EpochId {
        self.current_epoch
    }

    /// Close out the frontier and compute the commitment triple
    /// `(state_root, dag_head, reject_root)`.
    pub fn generate_epoch_output(&mut self) -> Result<(Hash32, Hash32, Hash32), ClusterError> {
        self.dag.generate_head();

        let children: Vec<_> = self.dag.head_children().to_vec();
        for idx in children {
            let token = self.dag.get(idx).operation.token;
            let trie_index = self.token_trie_index_or_create(&token)?;
            let (dag, tries) = (&mut self.dag, &mut self.token_tries);
            dag.apply_frontier_node(idx, &mut tries[trie_index].1)?;
        }

        let state_root = self.state_root();
        let dag_head = if self.dag.node_count() == 0 {
            ZERO_HASH
        } else {
            self.dag.head_hash()
        };
        let reject_root = self.reject_root();

        Ok((state_root, dag_head, reject_root))
    }

    /// Digest over every token root in registration order; zero with no
    /// tokens.
    pub fn state_root(&self) -> Hash32 {
        if self.token_tries.is_empty() {
            return ZERO_HASH;
        }
        let mut hasher = Sha256Hasher::new();
        for (_, trie) in &self.token_tries {
            hasher.update(&trie.root_hash());
        }
        hasher.finalize()
    }

    /// Digest over the Merkle hashes of every failed node; zero with
    /// none.
    pub fn reject_root(&self) -> Hash32 {
        let failed = self.dag.failed_node_hashes();
        if failed.is_empty() {
            return ZERO_HASH;
        }
        let mut hasher = Sha256Hasher::new();
        for hash in &failed {
            hasher.update(hash);
        }
        hasher.finalize()
    }

    /// Build, sign and submit this node's epoch output to the leader.
    pub fn generate_and_send_epoch_output(&mut self) -> Result<EpochOutput, ClusterError> {
        let (state_root, dag_head, reject_root) = self.generate_epoch_output()?;

        let mut output = EpochOutput {
            epoch_id: self.current_epoch,
            node_id: self.node_id,
            dag_head,
            state_root,
            reject_root,
            signature: [0u8; 64],
        };
        output.signature = *self.network.sign(&output.signing_bytes()).as_bytes();

        let Some(leader) = self.current_leader else {
            return Err(ClusterError::InputInvalid("no leader elected"));
        };

        if leader == self.node_id {
            self.accept_epoch_output(output);
        } else {
            let bytes = bincode::serialize(&output)
                .map_err(|_| ClusterError::InputInvalid("output encode failed"))?;
            self.network
                .send_message(leader, MessageKind::EpochOutput, &bytes)?;
        }

        Ok(output)
    }

    /// Keep at most one output per node, newest wins.
    pub(crate) fn accept_epoch_output(&mut self, output: EpochOutput) {
        if let Some(existing) = self
            .epoch_outputs
            .iter_mut()
            .find(|o| o.node_id == output.node_id)
        {
            *existing = output;
        } else {
            self.epoch_outputs.push(output);
        }
    }

    /// Leader-only: drain the inbox and check for a byte-equal commitment
    /// triple on ≥ ⌊n/2⌋+1 outputs. State is kept on failure so
    /// collection can resume.
    pub fn leader_collect_epoch_outputs(&mut self) -> Result<EpochOutput, ClusterError> {
        if !self.is_leader() {
            return Err(ClusterError::NotLeader);
        }

        self.process_inbox();

        let need = self.majority();
        let mut best: Option<(usize, EpochOutput)> = None;
        for candidate in &self.epoch_outputs {
            let matches = self
                .epoch_outputs
                .iter()
                .filter(|other| candidate.same_commitment(other))
                .count();
            if best.as_ref().map(|(n, _)| matches > *n).unwrap_or(true) {
                best = Some((matches, *candidate));
            }
        }

        match best {
            Some((matches, output)) if matches >= need => {
                self.epoch_output_collected = true;
                info!(
                    epoch = output.epoch_id,
                    matches, "epoch output ratified by majority"
                );
                Ok(output)
            }
            Some((matches, _)) => Err(ClusterError::NoMajority {
                have: matches,
                need,
            }),
            None => Err(ClusterError::NoMajority { have: 0, need }),
        }
    }

    /// Leader-only: broadcast the epoch's executed-transaction set for
    /// countersigning.
    pub fn leader_broadcast_tx_set(&mut self) -> Result<usize, ClusterError> {
        if !self.is_leader() {
            return Err(ClusterError::NotLeader);
        }

        let confirmed: Vec<ExecutedTx> = self
            .executed_txs
            .iter()
            .filter(|t| t.has_log)
            .copied()
            .collect();
        if confirmed.is_empty() {
            return Ok(0);
        }

        for chunk in confirmed.chunks(TX_SET_PER_ENVELOPE) {
            let payload = TxSetBroadcastPayload {
                epoch_id: self.current_epoch,
                txs: chunk.to_vec(),
            };
            match bincode::serialize(&payload) {
                Ok(bytes) => {
                    if let Err(err) = self.network.broadcast(MessageKind::TxSetBroadcast, &bytes) {
                        debug!(%err, "tx-set chunk broadcast skipped");
                    }
                }
                Err(err) => warn!(%err, "tx-set chunk encode failed"),
            }
        }
        Ok(confirmed.len())
    }

    /// Follower side of tx-set ratification: every record must match a
    /// locally observed confirmation; the accepted set is recorded in the
    /// Raft log and countersigned.
    pub fn receive_and_sign_tx_set(
        &mut self,
        tx_set: &[ExecutedTx],
    ) -> Result<NodeSignature, ClusterError> {
        for tx in tx_set {
            let known = self.executed_txs.iter().any(|local| {
                local.tx_id == tx.tx_id && local.chain_id == tx.chain_id && local.has_log
            });
            if !known {
                return Err(ClusterError::InputInvalid("unconfirmed tx in set"));
            }
        }

        let encoded = bincode::serialize(tx_set)
            .map_err(|_| ClusterError::InputInvalid("tx set encode failed"))?;
        let digest = sha256(&encoded);

        self.raft.append_local(LogEntry {
            term: 0,
            index: 0,
            tx_id: 0,
            timestamp: 0,
            data: digest.to_vec(),
        })?;

        Ok(self.network.sign(&encoded))
    }

    /// Leader-only, gated on ratification: push the agreed triple back
    /// toward the observed chains.
    pub fn leader_sync_to_l2_chains(&mut self) -> Result<EpochSyncPayload, ClusterError> {
        if !self.is_leader() {
            return Err(ClusterError::NotLeader);
        }
        if !self.epoch_output_collected {
            return Err(ClusterError::NoMajority {
                have: self.epoch_outputs.len(),
                need: self.majority(),
            });
        }

        let need = self.majority();
        let ratified = self
            .epoch_outputs
            .iter()
            .find(|candidate| {
                self.epoch_outputs
                    .iter()
                    .filter(|other| candidate.same_commitment(other))
                    .count()
                    >= need
            })
            .copied()
            .ok_or(ClusterError::NoMajority {
                have: 0,
                need,
            })?;

        let payload = EpochSyncPayload {
            epoch_id: ratified.epoch_id,
            dag_head: ratified.dag_head,
            state_root: ratified.state_root,
            reject_root: ratified.reject_root,
        };
        let bytes = bincode::serialize(&payload)
            .map_err(|_| ClusterError::InputInvalid("sync encode failed"))?;
        if let Err(err) = self.network.broadcast(MessageKind::EpochSyncToL2, &bytes) {
            debug!(%err, "L2 sync broadcast had no takers");
        }

        self.last_ratified = Some(payload);
        info!(epoch = payload.epoch_id, "commitment triple synced to L2");
        Ok(payload)
    }
}
