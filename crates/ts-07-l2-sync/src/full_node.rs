//! # L2 Full Node
//!
//! Per-chain header store and log-existence verification. Headers in this
//! core are synthesized from block numbers (the real chain RPC sits
//! outside the trust boundary); what matters to the cluster is the
//! parent-hash linkage and the receipts root the proofs replay against.

use crate::domain::entities::{L2BlockHeader, L2LogEntry, LogExistenceProof};
use crate::domain::errors::L2SyncError;
use shared_crypto::{sha256, sha256_concat, Sha256Hasher};
use shared_types::{ChainId, Hash32};
use std::collections::HashMap;
use tracing::debug;

/// Chain table capacity.
pub const MAX_L2_CHAINS: usize = 16;

/// Header store capacity per chain.
pub const MAX_BLOCK_HEADERS: usize = 10_000;

/// Proof depth cap.
const MAX_PROOF_DEPTH: usize = 32;

#[derive(Default)]
struct ChainStore {
    headers: Vec<L2BlockHeader>,
    latest_block_number: u64,
}

/// Header store plus verification cache for every observed chain.
pub struct L2FullNode {
    chains: HashMap<ChainId, ChainStore>,
    /// tx_hash → verdict, so repeated confirmations skip the replay.
    verification_cache: HashMap<Hash32, bool>,
}

impl L2FullNode {
    pub fn new() -> Self {
        Self {
            chains: HashMap::new(),
            verification_cache: HashMap::new(),
        }
    }

    /// Headers currently held for `chain_id`.
    pub fn header_count(&self, chain_id: ChainId) -> usize {
        self.chains.get(&chain_id).map(|c| c.headers.len()).unwrap_or(0)
    }

    pub fn latest_block_number(&self, chain_id: ChainId) -> u64 {
        self.chains
            .get(&chain_id)
            .map(|c| c.latest_block_number)
            .unwrap_or(0)
    }

    /// Pull headers `from_block..=to_block` into the store. Headers are
    /// derived from the block number digest; parent hashes chain within
    /// the fetched range.
    pub fn sync_block_headers(
        &mut self,
        chain_id: ChainId,
        from_block: u64,
        to_block: u64,
    ) -> Result<(), L2SyncError> {
        if from_block > to_block {
            return Err(L2SyncError::InvalidRange {
                from_block,
                to_block,
            });
        }
        if !self.chains.contains_key(&chain_id) && self.chains.len() >= MAX_L2_CHAINS {
            return Err(L2SyncError::TooManyChains {
                capacity: MAX_L2_CHAINS,
            });
        }

        let store = self.chains.entry(chain_id).or_default();
        let incoming = (to_block - from_block + 1) as usize;
        if store.headers.len() + incoming > MAX_BLOCK_HEADERS {
            return Err(L2SyncError::HeaderStoreFull {
                capacity: MAX_BLOCK_HEADERS,
            });
        }

        for block_number in from_block..=to_block {
            let digest = sha256(&block_number.to_le_bytes());
            let parent_hash = store
                .headers
                .last()
                .map(|h| h.block_hash)
                .unwrap_or([0u8; 32]);

            store.headers.push(L2BlockHeader {
                block_number,
                block_hash: digest,
                parent_hash,
                state_root: digest,
                receipts_root: digest,
                timestamp: block_number * 2,
                chain_id,
            });
            store.latest_block_number = block_number;
        }

        debug!(chain_id, from_block, to_block, "headers synced");
        Ok(())
    }

    pub fn block_header(&self, chain_id: ChainId, block_number: u64) -> Option<&L2BlockHeader> {
        self.chains
            .get(&chain_id)?
            .headers
            .iter()
            .find(|h| h.block_number == block_number)
    }

    /// Content hash of one log: tx hash, index, emitting contract, topics
    /// and data.
    pub fn compute_log_hash(log: &L2LogEntry) -> Hash32 {
        let mut hasher = Sha256Hasher::new();
        hasher.update(&log.tx_hash);
        hasher.update(&log.log_index.to_le_bytes());
        hasher.update(&log.contract_address.0);
        for topic in log.topics.iter().take(4) {
            hasher.update(topic);
        }
        hasher.update(&log.data);
        hasher.finalize()
    }

    /// Replay a sorted-pair Merkle path from `leaf_hash` and compare the
    /// result to the proof's claimed root.
    pub fn verify_merkle_proof(leaf_hash: &Hash32, proof: &LogExistenceProof) -> bool {
        let mut computed = *leaf_hash;
        for sibling in proof.siblings.iter().take(MAX_PROOF_DEPTH) {
            computed = if computed.as_slice() < sibling.as_slice() {
                sha256_concat(&[&computed, sibling])
            } else {
                sha256_concat(&[sibling, &computed])
            };
        }
        computed == proof.receipts_root
    }

    /// Full existence check: known header, matching receipts root, and a
    /// proof replay landing on it.
    pub fn verify_log_existence(&self, log: &L2LogEntry, proof: &LogExistenceProof) -> bool {
        let Some(header) = self.block_header(log.chain_id, log.block_number) else {
            return false;
        };
        if proof.receipts_root != header.receipts_root {
            return false;
        }

        let log_hash = Self::compute_log_hash(log);
        Self::verify_merkle_proof(&log_hash, proof)
    }

    /// Verify a batch with round-robin assignment across `tee_node_count`
    /// replicas. Returns `(verified, assigned_node)` per log; verdicts are
    /// cached by tx hash.
    pub fn distributed_verify_logs(
        &mut self,
        logs: &[L2LogEntry],
        proofs: &[LogExistenceProof],
        tee_node_count: u32,
    ) -> Vec<(bool, u32)> {
        let node_count = tee_node_count.max(1);

        logs.iter()
            .zip(proofs.iter())
            .enumerate()
            .map(|(i, (log, proof))| {
                let assigned = i as u32 % node_count;
                let verified = match self.verification_cache.get(&log.tx_hash) {
                    Some(cached) => *cached,
                    None => {
                        let verdict = self.verify_log_existence(log, proof);
                        self.verification_cache.insert(log.tx_hash, verdict);
                        verdict
                    }
                };
                (verified, assigned)
            })
            .collect()
    }
}

impl Default for L2FullNode {
    fn default() -> Self {
        Self::new()
    }
}
