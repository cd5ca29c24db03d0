//! # DAG Arena
//!
//! Nodes live in a vector; edges are indices. The synthetic head occupies
//! the reserved first slot and is rebuilt by every head generation. The
//! conflict index buckets balance-mutating nodes by `(account, token)` so
//! each insert only examines operations that can possibly conflict.

use crate::domain::errors::DagError;
use crate::domain::node::{
    DagNode, DagNodeRecord, NodeIdx, HEAD_NODE_ID, MAX_CHILDREN, MAX_PARENTS,
};
use crate::validation::{is_conflict, validate_tx};
use primitive_types::U256;
use sha2::{Digest, Sha256};
use shared_types::{
    balance_key, AccountAddress, Amount, Hash32, OpKind, Operation, TokenAddress, TxId, ZERO_HASH,
};
use std::collections::HashMap;
use tracing::{debug, warn};
use ts_01_state_trie::PatriciaTrie;

/// Arena capacity (operation nodes).
pub const MAX_DAG_NODES: usize = 100_000;

/// Bucket count of the conflict index.
pub const CONFLICT_INDEX_SIZE: usize = 1024;

/// Above this many nodes, neighbor linking samples recent nodes only.
pub const THIN_THRESHOLD: usize = 100;

/// Sample size for thinned neighbor linking.
pub const NEIGHBOR_SAMPLE: usize = 20;

const CONFLICT_INDEX_SALT: &[u8] = b"dag-conflict-index/v1";

/// The operation DAG of one replica.
pub struct MerkleDag {
    /// Index 0 is the synthetic head; operation nodes follow.
    arena: Vec<DagNode>,
    /// Digest over the head's child hashes, refreshed by head generation.
    head_hash: Hash32,
    /// Recently inserted nodes awaiting periodic broadcast.
    latest: Vec<NodeIdx>,
    /// Balance-mutating nodes bucketed by salted `(account, token)` hash.
    conflict_buckets: Vec<Vec<NodeIdx>>,
    /// node_id → arena index.
    id_index: HashMap<u64, NodeIdx>,
}

impl MerkleDag {
    pub fn new() -> Self {
        let mut head_op = Operation::new(
            0,
            0,
            0,
            OpKind::Set,
            TokenAddress::repeat(0),
            AccountAddress::repeat(0),
            Amount::ZERO,
        );
        head_op.hash = ZERO_HASH;

        let mut head = DagNode::new(head_op, 0);
        head.node_id = HEAD_NODE_ID;

        Self {
            arena: vec![head],
            head_hash: ZERO_HASH,
            latest: Vec::new(),
            conflict_buckets: vec![Vec::new(); CONFLICT_INDEX_SIZE],
            id_index: HashMap::new(),
        }
    }

    /// Number of operation nodes (the head entry is not counted).
    pub fn node_count(&self) -> usize {
        self.arena.len() - 1
    }

    pub fn get(&self, idx: NodeIdx) -> &DagNode {
        &self.arena[idx.0]
    }

    pub fn contains(&self, node_id: u64) -> bool {
        self.id_index.contains_key(&node_id)
    }

    pub fn idx_of(&self, node_id: u64) -> Option<NodeIdx> {
        self.id_index.get(&node_id).copied()
    }

    /// Operation nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIdx, &DagNode)> {
        self.arena
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, node)| (NodeIdx(i), node))
    }

    /// Last head digest produced by [`Self::generate_head`].
    pub fn head_hash(&self) -> Hash32 {
        self.head_hash
    }

    /// Frontier children selected by the last head generation.
    pub fn head_children(&self) -> &[NodeIdx] {
        &self.arena[0].children
    }

    // =========================================================================
    // INSERTION
    // =========================================================================

    /// Insert `op` at the given leader sort order, wiring conflict and
    /// neighbor links per the conflict-order rule.
    pub fn add_operation(&mut self, op: &Operation, tx_sort_order: u64) -> Result<NodeIdx, DagError> {
        if self.node_count() >= MAX_DAG_NODES {
            return Err(DagError::DagFull {
                capacity: MAX_DAG_NODES,
            });
        }
        if self.id_index.contains_key(&op.operation_id) {
            return Err(DagError::DuplicateOperation {
                operation_id: op.operation_id,
            });
        }

        // Re-seal the content hash; remote records are not trusted to have
        // computed it.
        let mut op = *op;
        op.hash = op.content_hash();

        let bucket_idx = Self::bucket_of(&op.account, &op.token);

        let mut node = DagNode::new(op, tx_sort_order);
        node.merkle_hash = Self::hash_parts(&op.hash, &[], &[]);

        let new_idx = NodeIdx(self.arena.len());
        self.arena.push(node);
        self.id_index.insert(op.operation_id, new_idx);
        self.latest.push(new_idx);

        // Conflict edges against the bucket population.
        let bucket: Vec<NodeIdx> = self.conflict_buckets[bucket_idx].clone();
        for existing_idx in bucket {
            let existing = &self.arena[existing_idx.0];
            if is_conflict(&op, &existing.operation) {
                let new_is_child = (tx_sort_order, op.operation_id)
                    > (existing.tx_sort_order, existing.node_id);
                if new_is_child {
                    self.connect(new_idx, existing_idx);
                } else {
                    self.connect(existing_idx, new_idx);
                }
            } else {
                self.connect_neighbors(new_idx, existing_idx);
            }
        }

        // Only balance-mutating kinds can conflict with later inserts.
        if op.kind.mutates_balance() {
            self.conflict_buckets[bucket_idx].push(new_idx);
        }

        // Neighbor links for DAG connectivity; sampled once the arena is
        // large enough that all-pairs linking would dominate insert cost.
        if self.node_count() > THIN_THRESHOLD {
            let recent: Vec<NodeIdx> = self
                .latest
                .iter()
                .rev()
                .filter(|idx| **idx != new_idx)
                .take(NEIGHBOR_SAMPLE)
                .copied()
                .collect();
            for existing_idx in recent {
                if !is_conflict(&op, &self.arena[existing_idx.0].operation) {
                    self.connect_neighbors(new_idx, existing_idx);
                }
            }
        } else {
            for i in 1..self.arena.len() - 1 {
                let existing_idx = NodeIdx(i);
                if !is_conflict(&op, &self.arena[i].operation) {
                    self.connect_neighbors(new_idx, existing_idx);
                }
            }
        }

        Ok(new_idx)
    }

    /// Directed causal edge `parent → child`; both endpoint hashes are
    /// recomputed, child first.
    fn connect(&mut self, child: NodeIdx, parent: NodeIdx) {
        if self.arena[child.0].parents.contains(&parent) {
            return;
        }
        if self.arena[child.0].parents.len() >= MAX_PARENTS {
            warn!(
                child = self.arena[child.0].node_id,
                "parent set full, conflict edge dropped"
            );
            return;
        }
        if self.arena[parent.0].children.len() >= MAX_CHILDREN {
            warn!(
                parent = self.arena[parent.0].node_id,
                "child set full, conflict edge dropped"
            );
            return;
        }

        self.arena[child.0].parents.push(parent);
        self.arena[parent.0].children.push(child);

        self.rehash(child);
        self.rehash(parent);
    }

    /// Bidirectional informational link; silently skipped at capacity.
    fn connect_neighbors(&mut self, a: NodeIdx, b: NodeIdx) {
        if a == b || self.arena[a.0].neighbors.contains(&b) {
            return;
        }
        if self.arena[a.0].neighbors.len() >= MAX_CHILDREN
            || self.arena[b.0].neighbors.len() >= MAX_CHILDREN
        {
            debug!("neighbor sets full, link skipped");
            return;
        }

        self.arena[a.0].neighbors.push(b);
        self.arena[b.0].neighbors.push(a);
    }

    // =========================================================================
    // HASHING
    // =========================================================================

    fn hash_parts(op_hash: &Hash32, parents: &[Hash32], children: &[Hash32]) -> Hash32 {
        let mut hasher = Sha256::new();
        hasher.update(op_hash);
        for parent in parents {
            hasher.update(parent);
        }
        for child in children {
            hasher.update(child);
        }
        hasher.finalize().into()
    }

    /// Digest of `(op.hash, parents[*].merkle, children[*].merkle)` using
    /// the links' current stored hashes.
    pub fn node_hash(&self, idx: NodeIdx) -> Hash32 {
        let node = &self.arena[idx.0];
        let parent_hashes: Vec<Hash32> = node
            .parents
            .iter()
            .map(|p| self.arena[p.0].merkle_hash)
            .collect();
        let child_hashes: Vec<Hash32> = node
            .children
            .iter()
            .map(|c| self.arena[c.0].merkle_hash)
            .collect();
        Self::hash_parts(&node.operation.hash, &parent_hashes, &child_hashes)
    }

    fn rehash(&mut self, idx: NodeIdx) {
        self.arena[idx.0].merkle_hash = self.node_hash(idx);
    }

    // =========================================================================
    // HEAD AND ROOT
    // =========================================================================

    /// Rebuild the synthetic head over the current frontier and refresh
    /// the head hash. Frontier nodes are flagged as head candidates.
    pub fn generate_head(&mut self) -> Hash32 {
        let frontier: Vec<NodeIdx> = self
            .arena
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, node)| node.is_frontier())
            .map(|(i, _)| NodeIdx(i))
            .collect();

        if frontier.len() > MAX_CHILDREN {
            warn!(
                frontier = frontier.len(),
                cap = MAX_CHILDREN,
                "head fan-in capped"
            );
        }
        let selected: Vec<NodeIdx> = frontier.into_iter().take(MAX_CHILDREN).collect();

        for idx in &selected {
            self.arena[idx.0].is_head_candidate = true;
        }

        let mut hasher = Sha256::new();
        for idx in &selected {
            hasher.update(self.arena[idx.0].merkle_hash);
        }
        self.head_hash = hasher.finalize().into();
        self.arena[0].children = selected;

        self.head_hash
    }

    /// Root commitment: the head hash over the current frontier, without
    /// mutating head state. The empty DAG commits to the zero hash.
    pub fn compute_root_hash(&self) -> Hash32 {
        if self.node_count() == 0 {
            return ZERO_HASH;
        }

        let mut hasher = Sha256::new();
        for (_, node) in self.nodes().filter(|(_, n)| n.is_frontier()).take(MAX_CHILDREN) {
            hasher.update(node.merkle_hash);
        }
        hasher.finalize().into()
    }

    // =========================================================================
    // STATE PROPAGATION
    // =========================================================================

    /// Lazily apply the parents of `idx` to the live trie. Failed parents
    /// are never applied; they are committed to by the reject root.
    pub fn update_parent_states(
        &mut self,
        idx: NodeIdx,
        token_tree: &mut PatriciaTrie,
    ) -> Result<(), DagError> {
        let parents = self.arena[idx.0].parents.clone();
        for parent_idx in parents {
            let parent = &self.arena[parent_idx.0];
            if parent.state_updated || parent.is_failed {
                continue;
            }
            let op = parent.operation;
            Self::apply_operation(&op, token_tree)?;
            self.arena[parent_idx.0].state_updated = true;
        }
        Ok(())
    }

    /// Consume one frontier node at the epoch boundary: apply it to its
    /// token's trie (unless failed) and mark it processed.
    pub fn apply_frontier_node(
        &mut self,
        idx: NodeIdx,
        token_tree: &mut PatriciaTrie,
    ) -> Result<(), DagError> {
        let node = &self.arena[idx.0];
        if node.state_updated {
            self.arena[idx.0].is_processed = true;
            return Ok(());
        }
        if node.is_failed {
            // Rejected operations still leave the frontier, but the trie
            // never sees them.
            self.arena[idx.0].is_processed = true;
            return Ok(());
        }

        let op = node.operation;
        Self::apply_operation(&op, token_tree)?;
        self.arena[idx.0].state_updated = true;
        self.arena[idx.0].is_processed = true;
        Ok(())
    }

    /// Apply every current head child to `token_tree`. Single-token
    /// convenience over [`Self::apply_frontier_node`].
    pub fn update_state(&mut self, token_tree: &mut PatriciaTrie) -> Result<(), DagError> {
        let children = self.arena[0].children.clone();
        for idx in children {
            self.apply_frontier_node(idx, token_tree)?;
        }
        Ok(())
    }

    /// Unconditional balance write. Missing accounts spring into existence:
    /// ADD/SET store the amount, SUBTRACT stores zero. Arithmetic wraps;
    /// validation is what keeps wrapped results out of honest state.
    fn apply_operation(op: &Operation, token_tree: &mut PatriciaTrie) -> Result<(), DagError> {
        let key = balance_key(&op.account, &op.token);

        let new_balance = match token_tree.get(&key) {
            Some(bytes) => {
                let current = U256::from_big_endian(bytes);
                match op.kind {
                    OpKind::Add => current.overflowing_add(op.amount.to_u256()).0,
                    OpKind::Subtract => current.overflowing_sub(op.amount.to_u256()).0,
                    OpKind::Set => op.amount.to_u256(),
                }
            }
            None => match op.kind {
                OpKind::Add | OpKind::Set => op.amount.to_u256(),
                OpKind::Subtract => U256::zero(),
            },
        };

        token_tree.insert(&key, Amount::from_u256(new_balance).as_bytes())?;
        Ok(())
    }

    // =========================================================================
    // TRANSACTIONS
    // =========================================================================

    /// All operations sharing `tx_id`, in arena order.
    pub fn collect_tx_operations(&self, tx_id: TxId) -> Vec<Operation> {
        self.nodes()
            .filter(|(_, node)| node.operation.tx_id == tx_id)
            .map(|(_, node)| node.operation)
            .collect()
    }

    /// Replay the whole transaction against a sandbox of `token_tree`.
    pub fn validate_transaction(&self, tx_id: TxId, token_tree: &PatriciaTrie) -> bool {
        let operations = self.collect_tx_operations(tx_id);
        validate_tx(&operations, token_tree)
    }

    /// Stamp every node of `tx_id` with the validation verdict.
    pub fn mark_tx_failed(&mut self, tx_id: TxId, failed: bool) {
        for node in self.arena.iter_mut().skip(1) {
            if node.operation.tx_id == tx_id {
                node.is_failed = failed;
                node.operation.is_valid = !failed;
            }
        }
    }

    /// Nodes marked failed, in arena order. The reject root commits to
    /// their Merkle hashes.
    pub fn failed_node_hashes(&self) -> Vec<Hash32> {
        self.nodes()
            .filter(|(_, node)| node.is_failed)
            .map(|(_, node)| node.merkle_hash)
            .collect()
    }

    /// Nodes belonging to the given transactions plus the transitive
    /// closure of their descendants.
    pub fn find_block_related_nodes(&self, block_tx_ids: &[TxId]) -> Vec<NodeIdx> {
        if block_tx_ids.is_empty() {
            return Vec::new();
        }

        let tx_set: std::collections::HashSet<TxId> = block_tx_ids.iter().copied().collect();
        let mut found: Vec<NodeIdx> = self
            .nodes()
            .filter(|(_, node)| tx_set.contains(&node.operation.tx_id))
            .map(|(idx, _)| idx)
            .collect();
        let mut seen: std::collections::HashSet<NodeIdx> = found.iter().copied().collect();

        let mut cursor = 0;
        while cursor < found.len() {
            let current = found[cursor];
            cursor += 1;
            for child in self.arena[current.0].children.clone() {
                if seen.insert(child) {
                    found.push(child);
                }
            }
        }

        found
    }

    // =========================================================================
    // SYNCHRONIZATION
    // =========================================================================

    /// Buffer of nodes inserted since the last periodic broadcast.
    pub fn drain_latest(&mut self) -> Vec<NodeIdx> {
        std::mem::take(&mut self.latest)
    }

    /// Re-queue a node for the next periodic broadcast.
    pub fn note_latest(&mut self, idx: NodeIdx) {
        if !self.latest.contains(&idx) {
            self.latest.push(idx);
        }
    }

    pub fn latest(&self) -> &[NodeIdx] {
        &self.latest
    }

    /// Transfer record for one node, links carried as node ids.
    pub fn record(&self, idx: NodeIdx) -> DagNodeRecord {
        let node = &self.arena[idx.0];
        DagNodeRecord {
            node_id: node.node_id,
            operation: node.operation,
            tx_sort_order: node.tx_sort_order,
            parent_ids: node
                .parents
                .iter()
                .map(|p| self.arena[p.0].node_id)
                .collect(),
            merkle_hash: node.merkle_hash,
            is_head_candidate: node.is_head_candidate,
            is_processed: node.is_processed,
            state_updated: node.state_updated,
            is_failed: node.is_failed,
        }
    }

    /// Insert a record received from another replica. Refused until every
    /// parent is locally present; lifecycle flags survive the transfer.
    pub fn insert_remote(&mut self, record: &DagNodeRecord) -> Result<NodeIdx, DagError> {
        if let Some(existing) = self.idx_of(record.node_id) {
            return Ok(existing);
        }

        let missing = record
            .parent_ids
            .iter()
            .filter(|id| !self.contains(**id))
            .count();
        if missing > 0 {
            return Err(DagError::MissingParents {
                node_id: record.node_id,
                missing,
            });
        }

        let idx = self.add_operation(&record.operation, record.tx_sort_order)?;
        let node = &mut self.arena[idx.0];
        node.is_head_candidate = record.is_head_candidate;
        node.is_processed = record.is_processed;
        node.state_updated = record.state_updated;
        Ok(idx)
    }

    fn bucket_of(account: &AccountAddress, token: &TokenAddress) -> usize {
        let mut hasher = Sha256::new();
        hasher.update(CONFLICT_INDEX_SALT);
        hasher.update(account.0);
        hasher.update(token.0);
        let digest: Hash32 = hasher.finalize().into();
        let word = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]);
        word as usize % CONFLICT_INDEX_SIZE
    }
}

impl Default for MerkleDag {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_op(operation_id: u64, tx_id: u64, kind: OpKind, account: u8, amount: u64) -> Operation {
        Operation::new(
            operation_id,
            tx_id,
            10,
            kind,
            TokenAddress::repeat(0x11),
            AccountAddress::repeat(account),
            Amount::from_u64(amount),
        )
    }

    fn seeded_trie(account: u8, amount: u64) -> PatriciaTrie {
        let mut trie = PatriciaTrie::new();
        let key = balance_key(&AccountAddress::repeat(account), &TokenAddress::repeat(0x11));
        trie.insert(&key, Amount::from_u64(amount).as_bytes()).unwrap();
        trie
    }

    fn balance_of(trie: &PatriciaTrie, account: u8) -> u64 {
        let key = balance_key(&AccountAddress::repeat(account), &TokenAddress::repeat(0x11));
        trie.get(&key)
            .map(|b| U256::from_big_endian(b).as_u64())
            .unwrap_or(0)
    }

    #[test]
    fn test_insert_count_and_seed_hash() {
        let mut dag = MerkleDag::new();
        for i in 0..5 {
            // Distinct accounts: no conflicts, no causal edges.
            dag.add_operation(&make_op(i, i, OpKind::Add, i as u8, 10), i).unwrap();
        }

        assert_eq!(dag.node_count(), 5);
        for (idx, node) in dag.nodes() {
            assert!(node.parents.is_empty());
            assert!(node.children.is_empty());
            // Unlinked node: merkle = H(op.hash).
            let expected: Hash32 = Sha256::digest(node.operation.hash).into();
            assert_eq!(node.merkle_hash, expected);
            assert_eq!(dag.node_hash(idx), expected);
        }
    }

    #[test]
    fn test_duplicate_operation_rejected() {
        let mut dag = MerkleDag::new();
        let op = make_op(1, 1, OpKind::Add, 0xAA, 10);
        dag.add_operation(&op, 0).unwrap();

        assert_eq!(
            dag.add_operation(&op, 1),
            Err(DagError::DuplicateOperation { operation_id: 1 })
        );
    }

    #[test]
    fn test_conflict_edge_follows_sort_order() {
        // Insert the higher-sorted SUB first; the lower-sorted one must
        // still end up as its ancestor.
        let mut dag = MerkleDag::new();
        let high = dag
            .add_operation(&make_op(11, 11, OpKind::Subtract, 0xAA, 1), 7)
            .unwrap();
        let low = dag
            .add_operation(&make_op(10, 10, OpKind::Subtract, 0xAA, 1), 3)
            .unwrap();

        assert!(dag.get(high).parents.contains(&low));
        assert!(dag.get(low).children.contains(&high));
        // And not the other way round.
        assert!(!dag.get(low).parents.contains(&high));
    }

    #[test]
    fn test_conflict_tie_broken_by_operation_id() {
        let mut dag = MerkleDag::new();
        let a = dag
            .add_operation(&make_op(1, 1, OpKind::Subtract, 0xAA, 1), 5)
            .unwrap();
        let b = dag
            .add_operation(&make_op(2, 2, OpKind::Subtract, 0xAA, 1), 5)
            .unwrap();

        assert!(dag.get(b).parents.contains(&a));
    }

    #[test]
    fn test_set_never_gains_conflict_parent() {
        let mut dag = MerkleDag::new();
        dag.add_operation(&make_op(1, 1, OpKind::Subtract, 0xAA, 1), 1).unwrap();
        let set = dag
            .add_operation(&make_op(2, 2, OpKind::Set, 0xAA, 5), 2)
            .unwrap();

        assert!(dag.get(set).parents.is_empty());
        assert!(dag.get(set).children.is_empty());
        // It still records the sibling as a neighbor.
        assert_eq!(dag.get(set).neighbors.len(), 1);
    }

    #[test]
    fn test_acyclic_after_conflicts() {
        let mut dag = MerkleDag::new();
        for i in 0..8u64 {
            dag.add_operation(&make_op(i, i, OpKind::Subtract, 0xAA, 1), i).unwrap();
        }

        // Walk up from every node; parents must always have strictly
        // lower (sort, id) keys, so no cycle can exist.
        for (idx, node) in dag.nodes() {
            for parent in &node.parents {
                let p = dag.get(*parent);
                assert!(
                    (p.tx_sort_order, p.node_id) < (node.tx_sort_order, node.node_id),
                    "edge violates the conflict order at {:?}",
                    idx
                );
            }
        }
    }

    #[test]
    fn test_merkle_hash_tracks_edge_insertion() {
        let mut dag = MerkleDag::new();
        let parent_op = make_op(1, 1, OpKind::Subtract, 0xAA, 1);
        let child_op = make_op(2, 2, OpKind::Subtract, 0xAA, 1);

        let parent = dag.add_operation(&parent_op, 1).unwrap();
        let child = dag.add_operation(&child_op, 2).unwrap();

        // Child hash captured the parent's pre-link hash; the parent was
        // recomputed last and sees the child's final hash.
        let parent_seed: Hash32 = Sha256::digest(parent_op.hash).into();
        let expected_child = MerkleDag::hash_parts(&child_op.hash, &[parent_seed], &[]);
        assert_eq!(dag.get(child).merkle_hash, expected_child);

        let expected_parent = MerkleDag::hash_parts(&parent_op.hash, &[], &[expected_child]);
        assert_eq!(dag.get(parent).merkle_hash, expected_parent);
        assert_eq!(dag.node_hash(parent), dag.get(parent).merkle_hash);
    }

    #[test]
    fn test_head_over_single_node() {
        let mut dag = MerkleDag::new();
        let idx = dag.add_operation(&make_op(1, 1, OpKind::Add, 0xAA, 100), 0).unwrap();

        let head = dag.generate_head();
        let expected: Hash32 = Sha256::digest(dag.get(idx).merkle_hash).into();

        assert_eq!(head, expected);
        assert_eq!(dag.head_children(), &[idx]);
        assert!(dag.get(idx).is_head_candidate);
        assert_eq!(dag.compute_root_hash(), head);
    }

    #[test]
    fn test_empty_dag_root_is_zero() {
        assert_eq!(MerkleDag::new().compute_root_hash(), ZERO_HASH);
    }

    #[test]
    fn test_head_excludes_non_frontier() {
        let mut dag = MerkleDag::new();
        let parent = dag
            .add_operation(&make_op(1, 1, OpKind::Subtract, 0xAA, 1), 1)
            .unwrap();
        let child = dag
            .add_operation(&make_op(2, 2, OpKind::Subtract, 0xAA, 1), 2)
            .unwrap();

        dag.generate_head();

        // Only the childless node is on the frontier.
        assert_eq!(dag.head_children(), &[child]);
        assert!(!dag.get(parent).is_head_candidate);
    }

    #[test]
    fn test_update_parent_states_applies_once() {
        let mut dag = MerkleDag::new();
        let mut trie = seeded_trie(0xAA, 100);

        let parent = dag
            .add_operation(&make_op(1, 1, OpKind::Subtract, 0xAA, 10), 1)
            .unwrap();
        let child = dag
            .add_operation(&make_op(2, 2, OpKind::Subtract, 0xAA, 10), 2)
            .unwrap();

        dag.update_parent_states(child, &mut trie).unwrap();
        assert_eq!(balance_of(&trie, 0xAA), 90);
        assert!(dag.get(parent).state_updated);

        // A second propagation pass must not re-apply.
        dag.update_parent_states(child, &mut trie).unwrap();
        assert_eq!(balance_of(&trie, 0xAA), 90);
    }

    #[test]
    fn test_failed_parent_is_never_applied() {
        let mut dag = MerkleDag::new();
        let mut trie = seeded_trie(0xAA, 100);

        dag.add_operation(&make_op(1, 1, OpKind::Subtract, 0xAA, 10), 1).unwrap();
        let child = dag
            .add_operation(&make_op(2, 2, OpKind::Subtract, 0xAA, 10), 2)
            .unwrap();
        dag.mark_tx_failed(1, true);

        dag.update_parent_states(child, &mut trie).unwrap();
        assert_eq!(balance_of(&trie, 0xAA), 100);
    }

    #[test]
    fn test_update_state_consumes_frontier() {
        let mut dag = MerkleDag::new();
        let mut trie = seeded_trie(0xAA, 100);

        let idx = dag.add_operation(&make_op(1, 1, OpKind::Subtract, 0xAA, 30), 1).unwrap();
        dag.generate_head();
        dag.update_state(&mut trie).unwrap();

        assert_eq!(balance_of(&trie, 0xAA), 70);
        assert!(dag.get(idx).is_processed);
        assert!(dag.get(idx).state_updated);

        // Processed nodes leave the frontier.
        dag.generate_head();
        assert!(dag.head_children().is_empty());
    }

    #[test]
    fn test_update_state_skips_failed_but_processes_them() {
        let mut dag = MerkleDag::new();
        let mut trie = seeded_trie(0xAA, 5);

        let idx = dag.add_operation(&make_op(1, 1, OpKind::Subtract, 0xAA, 10), 1).unwrap();
        dag.mark_tx_failed(1, true);

        dag.generate_head();
        dag.update_state(&mut trie).unwrap();

        assert_eq!(balance_of(&trie, 0xAA), 5);
        assert!(dag.get(idx).is_processed);
        assert!(!dag.get(idx).state_updated);
        assert_eq!(dag.failed_node_hashes().len(), 1);
    }

    #[test]
    fn test_collect_and_mark_tx() {
        let mut dag = MerkleDag::new();
        dag.add_operation(&make_op(1, 7, OpKind::Subtract, 0xAA, 10), 1).unwrap();
        dag.add_operation(&make_op(2, 7, OpKind::Add, 0xBB, 10), 1).unwrap();
        dag.add_operation(&make_op(3, 8, OpKind::Add, 0xCC, 1), 2).unwrap();

        let ops = dag.collect_tx_operations(7);
        assert_eq!(ops.len(), 2);

        dag.mark_tx_failed(7, true);
        let failed = dag.failed_node_hashes();
        assert_eq!(failed.len(), 2);
        for (_, node) in dag.nodes() {
            if node.operation.tx_id == 7 {
                assert!(!node.operation.is_valid);
            } else {
                assert!(node.operation.is_valid);
            }
        }
    }

    #[test]
    fn test_find_block_related_nodes_includes_descendants() {
        let mut dag = MerkleDag::new();
        let a = dag.add_operation(&make_op(1, 1, OpKind::Subtract, 0xAA, 1), 1).unwrap();
        let b = dag.add_operation(&make_op(2, 2, OpKind::Subtract, 0xAA, 1), 2).unwrap();
        let c = dag.add_operation(&make_op(3, 3, OpKind::Subtract, 0xAA, 1), 3).unwrap();

        // Chain a → b → c through conflicts; asking for tx 1 pulls the
        // whole descendant closure.
        let related = dag.find_block_related_nodes(&[1]);
        assert!(related.contains(&a));
        assert!(related.contains(&b));
        assert!(related.contains(&c));
    }

    #[test]
    fn test_remote_insert_requires_parents() {
        let mut source = MerkleDag::new();
        source.add_operation(&make_op(1, 1, OpKind::Subtract, 0xAA, 1), 1).unwrap();
        let child = source
            .add_operation(&make_op(2, 2, OpKind::Subtract, 0xAA, 1), 2)
            .unwrap();
        let child_record = source.record(child);

        let mut target = MerkleDag::new();
        assert!(matches!(
            target.insert_remote(&child_record),
            Err(DagError::MissingParents { node_id: 2, missing: 1 })
        ));

        let parent_record = source.record(source.idx_of(1).unwrap());
        target.insert_remote(&parent_record).unwrap();
        let inserted = target.insert_remote(&child_record).unwrap();
        assert!(target.get(inserted).parents.len() == 1);
    }

    #[test]
    fn test_remote_insert_preserves_lifecycle_flags() {
        let mut source = MerkleDag::new();
        let idx = source.add_operation(&make_op(1, 1, OpKind::Add, 0xAA, 1), 1).unwrap();
        let mut trie = PatriciaTrie::new();
        source.generate_head();
        source.update_state(&mut trie).unwrap();

        let record = source.record(idx);
        assert!(record.is_processed && record.state_updated && record.is_head_candidate);

        let mut target = MerkleDag::new();
        let inserted = target.insert_remote(&record).unwrap();
        let node = target.get(inserted);
        assert!(node.is_processed);
        assert!(node.state_updated);
        assert!(node.is_head_candidate);
    }

    #[test]
    fn test_remote_insert_is_idempotent() {
        let mut source = MerkleDag::new();
        let idx = source.add_operation(&make_op(1, 1, OpKind::Add, 0xAA, 1), 1).unwrap();
        let record = source.record(idx);

        let mut target = MerkleDag::new();
        let first = target.insert_remote(&record).unwrap();
        let second = target.insert_remote(&record).unwrap();
        assert_eq!(first, second);
        assert_eq!(target.node_count(), 1);
    }

    #[test]
    fn test_neighbor_thinning_bounds_links() {
        let mut dag = MerkleDag::new();
        // Non-conflicting ADDs across distinct accounts, enough to cross
        // the thinning threshold.
        for i in 0..(THIN_THRESHOLD as u64 + 20) {
            dag.add_operation(&make_op(i, i, OpKind::Add, (i % 250) as u8, 1), i).unwrap();
        }

        // Every node's neighbor set respects the cap.
        for (_, node) in dag.nodes() {
            assert!(node.neighbors.len() <= MAX_CHILDREN);
        }
    }

    #[test]
    fn test_latest_buffer_drains() {
        let mut dag = MerkleDag::new();
        let a = dag.add_operation(&make_op(1, 1, OpKind::Add, 0xAA, 1), 1).unwrap();

        assert_eq!(dag.latest(), &[a]);
        let drained = dag.drain_latest();
        assert_eq!(drained, vec![a]);
        assert!(dag.latest().is_empty());

        dag.note_latest(a);
        assert_eq!(dag.latest(), &[a]);
    }
}
