//! # L2 Simulator
//!
//! Stands in for the observed chains during development and tests.
//! Transfers come out as a debit+credit pair sharing one tx id; mints and
//! burns are single-leg. The background runner is the one producer thread
//! in the system, feeding the cluster loop through a bounded channel.

use crate::domain::entities::OperationEvent;
use crate::domain::errors::L2SyncError;
use crate::full_node::MAX_L2_CHAINS;
use shared_crypto::EntropySource;
use shared_types::{AccountAddress, Amount, ChainId, TokenAddress};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

struct SimChain {
    chain_id: ChainId,
    name: String,
    block_number: u64,
    tx_counter: u64,
}

/// Multi-chain operation-event source.
pub struct L2Simulator {
    chains: Vec<SimChain>,
    next_operation_id: u64,
    next_tx_id: u64,
    entropy: Box<dyn EntropySource>,
}

impl L2Simulator {
    pub fn new(entropy: Box<dyn EntropySource>) -> Self {
        Self {
            chains: Vec::new(),
            next_operation_id: 1,
            next_tx_id: 1,
            entropy,
        }
    }

    pub fn add_chain(&mut self, chain_id: ChainId, name: &str) -> Result<(), L2SyncError> {
        if self.chains.iter().any(|c| c.chain_id == chain_id) {
            return Ok(());
        }
        if self.chains.len() >= MAX_L2_CHAINS {
            return Err(L2SyncError::TooManyChains {
                capacity: MAX_L2_CHAINS,
            });
        }
        self.chains.push(SimChain {
            chain_id,
            name: name.to_string(),
            block_number: 0,
            tx_counter: 0,
        });
        Ok(())
    }

    pub fn chain_ids(&self) -> Vec<ChainId> {
        self.chains.iter().map(|c| c.chain_id).collect()
    }

    pub fn chain_name(&self, chain_id: ChainId) -> Option<&str> {
        self.chains
            .iter()
            .find(|c| c.chain_id == chain_id)
            .map(|c| c.name.as_str())
    }

    /// Transactions generated so far on one chain.
    pub fn tx_count(&self, chain_id: ChainId) -> u64 {
        self.chains
            .iter()
            .find(|c| c.chain_id == chain_id)
            .map(|c| c.tx_counter)
            .unwrap_or(0)
    }

    /// A transfer is two legs of one transaction: debit the sender,
    /// credit the receiver.
    pub fn generate_transfer(
        &mut self,
        chain_id: ChainId,
        token: TokenAddress,
        from: AccountAddress,
        to: AccountAddress,
        amount: Amount,
    ) -> Result<[OperationEvent; 2], L2SyncError> {
        let (tx_id, timestamp) = self.next_tx(chain_id)?;

        let debit = OperationEvent {
            chain_id,
            operation_id: self.next_operation_id(),
            tx_id,
            timestamp,
            op_type: 1,
            token,
            account: from,
            amount,
        };
        let credit = OperationEvent {
            chain_id,
            operation_id: self.next_operation_id(),
            tx_id,
            timestamp,
            op_type: 0,
            token,
            account: to,
            amount,
        };
        Ok([debit, credit])
    }

    pub fn generate_mint(
        &mut self,
        chain_id: ChainId,
        token: TokenAddress,
        to: AccountAddress,
        amount: Amount,
    ) -> Result<OperationEvent, L2SyncError> {
        let (tx_id, timestamp) = self.next_tx(chain_id)?;
        Ok(OperationEvent {
            chain_id,
            operation_id: self.next_operation_id(),
            tx_id,
            timestamp,
            op_type: 0,
            token,
            account: to,
            amount,
        })
    }

    pub fn generate_burn(
        &mut self,
        chain_id: ChainId,
        token: TokenAddress,
        from: AccountAddress,
        amount: Amount,
    ) -> Result<OperationEvent, L2SyncError> {
        let (tx_id, timestamp) = self.next_tx(chain_id)?;
        Ok(OperationEvent {
            chain_id,
            operation_id: self.next_operation_id(),
            tx_id,
            timestamp,
            op_type: 1,
            token,
            account: from,
            amount,
        })
    }

    /// Random 20-byte account.
    pub fn random_account(&mut self) -> AccountAddress {
        let mut bytes = [0u8; 20];
        let _ = self.entropy.fill(&mut bytes);
        AccountAddress(bytes)
    }

    /// Random 42-byte token tag.
    pub fn random_token(&mut self) -> TokenAddress {
        let mut bytes = [0u8; 42];
        let _ = self.entropy.fill(&mut bytes);
        TokenAddress(bytes)
    }

    fn random_amount(&mut self) -> Amount {
        let draw = self.entropy.next_u64().unwrap_or(1);
        Amount::from_u64(draw % 1_000 + 1)
    }

    fn next_operation_id(&mut self) -> u64 {
        let id = self.next_operation_id;
        self.next_operation_id += 1;
        id
    }

    fn next_tx(&mut self, chain_id: ChainId) -> Result<(u64, u64), L2SyncError> {
        let tx_id = self.next_tx_id;
        self.next_tx_id += 1;

        let chain = self
            .chains
            .iter_mut()
            .find(|c| c.chain_id == chain_id)
            .ok_or(L2SyncError::UnknownChain { chain_id })?;
        chain.block_number += 1;
        chain.tx_counter += 1;

        Ok((tx_id, chain.block_number * 2))
    }

    /// Run as the background producer: one random event batch per
    /// interval, per registered chain round-robin, until `stop` is set or
    /// the receiving side goes away.
    pub fn run_background(
        mut self,
        sender: SyncSender<OperationEvent>,
        interval: Duration,
        stop: Arc<AtomicBool>,
        token: TokenAddress,
        accounts: Vec<AccountAddress>,
    ) {
        info!(chains = self.chains.len(), "simulator thread running");

        let mut round = 0usize;
        while !stop.load(Ordering::Relaxed) {
            let chain_ids = self.chain_ids();
            if chain_ids.is_empty() || accounts.is_empty() {
                break;
            }
            let chain_id = chain_ids[round % chain_ids.len()];
            round += 1;

            let amount = self.random_amount();
            let from = accounts[round % accounts.len()];
            let to = accounts[(round + 1) % accounts.len()];

            let events: Vec<OperationEvent> = match self.entropy.next_u64().unwrap_or(0) % 3 {
                0 => match self.generate_mint(chain_id, token, to, amount) {
                    Ok(event) => vec![event],
                    Err(_) => break,
                },
                1 => match self.generate_transfer(chain_id, token, from, to, amount) {
                    Ok(pair) => pair.to_vec(),
                    Err(_) => break,
                },
                _ => match self.generate_burn(chain_id, token, from, amount) {
                    Ok(event) => vec![event],
                    Err(_) => break,
                },
            };

            for event in events {
                if sender.send(event).is_err() {
                    debug!("event channel closed, simulator stopping");
                    return;
                }
            }

            std::thread::sleep(interval);
        }
    }
}
