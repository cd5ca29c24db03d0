//! # Sequencer Service
//!
//! Ingests raw logs, orders them by `(timestamp, sequence_id)` and applies
//! balance mutations to per-token tries. Logs that fail the signature stub
//! or would underflow a balance are skipped and left unprocessed history,
//! not retried.

use crate::domain::entities::{LogKind, TokenLog};
use crate::domain::errors::SequencerError;
use shared_types::{balance_key, AccountAddress, Amount, Hash32, TokenAddress};
use tracing::{debug, warn};
use ts_01_state_trie::PatriciaTrie;

/// Upper bound on queued logs.
pub const MAX_SEQUENCER_LOGS: usize = 10_000;

/// Upper bound on distinct tokens.
pub const MAX_SEQUENCER_TOKENS: usize = 16;

/// Single-node per-token sequencer.
pub struct Sequencer {
    token_tries: Vec<(TokenAddress, PatriciaTrie)>,
    log_queue: Vec<TokenLog>,
    next_sequence_id: u64,
}

impl Sequencer {
    pub fn new() -> Self {
        Self {
            token_tries: Vec::new(),
            log_queue: Vec::new(),
            next_sequence_id: 1,
        }
    }

    /// Enqueue a raw log, assigning its sequence id.
    pub fn add_log(&mut self, log: TokenLog) -> Result<u64, SequencerError> {
        if self.log_queue.len() >= MAX_SEQUENCER_LOGS {
            return Err(SequencerError::LogQueueFull {
                capacity: MAX_SEQUENCER_LOGS,
            });
        }

        let mut log = log;
        log.sequence_id = self.next_sequence_id;
        self.next_sequence_id += 1;
        log.processed = false;
        self.log_queue.push(log);

        Ok(log.sequence_id)
    }

    /// Drain unprocessed logs in `(timestamp, sequence_id)` order and apply
    /// them to the token tries. Returns the number applied.
    pub fn process_logs(&mut self) -> Result<usize, SequencerError> {
        let mut pending: Vec<TokenLog> = self
            .log_queue
            .iter()
            .filter(|log| !log.processed)
            .copied()
            .collect();

        pending.sort_by_key(|log| (log.timestamp, log.sequence_id));

        let mut applied = 0;
        for log in pending {
            if !Self::verify_log_signature(&log) {
                warn!(sequence_id = log.sequence_id, "dropping unsigned log");
                self.mark_processed(log.sequence_id);
                continue;
            }

            match self.apply_log(&log) {
                Ok(()) => {
                    applied += 1;
                    self.mark_processed(log.sequence_id);
                }
                Err(SequencerError::TooManyTokens { .. }) => {
                    warn!(sequence_id = log.sequence_id, "no capacity for token, dropping log");
                    self.mark_processed(log.sequence_id);
                }
                Err(err) => {
                    debug!(sequence_id = log.sequence_id, %err, "log rejected");
                    self.mark_processed(log.sequence_id);
                }
            }
        }

        Ok(applied)
    }

    /// Root hash of one token's balance trie.
    pub fn token_root(&self, token: &TokenAddress) -> Result<Hash32, SequencerError> {
        self.token_tries
            .iter()
            .find(|(addr, _)| addr == token)
            .map(|(_, trie)| trie.root_hash())
            .ok_or(SequencerError::UnknownToken)
    }

    /// Current balance of `(account, token)`, zero when absent.
    pub fn balance(&self, token: &TokenAddress, account: &AccountAddress) -> Amount {
        let key = balance_key(account, token);
        self.token_tries
            .iter()
            .find(|(addr, _)| addr == token)
            .and_then(|(_, trie)| trie.get(&key))
            .and_then(|bytes| <[u8; 32]>::try_from(bytes).ok())
            .map(Amount)
            .unwrap_or(Amount::ZERO)
    }

    /// Stub contract: any non-zero signature byte counts as signed.
    pub fn verify_log_signature(log: &TokenLog) -> bool {
        log.signature.iter().any(|b| *b != 0)
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn mark_processed(&mut self, sequence_id: u64) {
        if let Some(entry) = self
            .log_queue
            .iter_mut()
            .find(|l| l.sequence_id == sequence_id)
        {
            entry.processed = true;
        }
    }

    fn apply_log(&mut self, log: &TokenLog) -> Result<(), SequencerError> {
        match log.kind {
            LogKind::Transfer => {
                self.debit(&log.token, &log.from, &log.amount)?;
                self.credit(&log.token, &log.to, &log.amount)
            }
            LogKind::Mint => self.credit(&log.token, &log.to, &log.amount),
            LogKind::Burn => self.debit(&log.token, &log.from, &log.amount),
            // Allowance bookkeeping is an L2 concern; the log is accepted
            // but moves no balance.
            LogKind::Approve => Ok(()),
        }
    }

    fn credit(
        &mut self,
        token: &TokenAddress,
        account: &AccountAddress,
        amount: &Amount,
    ) -> Result<(), SequencerError> {
        let current = self.balance(token, account).to_u256();
        let (next, _overflow) = current.overflowing_add(amount.to_u256());
        self.store_balance(token, account, Amount::from_u256(next))
    }

    fn debit(
        &mut self,
        token: &TokenAddress,
        account: &AccountAddress,
        amount: &Amount,
    ) -> Result<(), SequencerError> {
        let current = self.balance(token, account).to_u256();
        let next = current
            .checked_sub(amount.to_u256())
            .ok_or(SequencerError::InsufficientBalance)?;
        self.store_balance(token, account, Amount::from_u256(next))
    }

    fn store_balance(
        &mut self,
        token: &TokenAddress,
        account: &AccountAddress,
        amount: Amount,
    ) -> Result<(), SequencerError> {
        let key = balance_key(account, token);
        let trie = self.trie_for(token)?;
        trie.insert(&key, amount.as_bytes())?;
        Ok(())
    }

    fn trie_for(&mut self, token: &TokenAddress) -> Result<&mut PatriciaTrie, SequencerError> {
        if let Some(idx) = self.token_tries.iter().position(|(addr, _)| addr == token) {
            return Ok(&mut self.token_tries[idx].1);
        }

        if self.token_tries.len() >= MAX_SEQUENCER_TOKENS {
            return Err(SequencerError::TooManyTokens {
                capacity: MAX_SEQUENCER_TOKENS,
            });
        }

        self.token_tries.push((*token, PatriciaTrie::new()));
        let last = self.token_tries.len() - 1;
        Ok(&mut self.token_tries[last].1)
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> TokenAddress {
        TokenAddress::repeat(0x11)
    }

    fn make_log(timestamp: u64, kind: LogKind, from: u8, to: u8, amount: u64) -> TokenLog {
        TokenLog::new(
            timestamp,
            kind,
            token(),
            AccountAddress::repeat(from),
            AccountAddress::repeat(to),
            Amount::from_u64(amount),
            [1u8; 65],
        )
    }

    #[test]
    fn test_sequence_ids_are_monotone() {
        let mut sequencer = Sequencer::new();
        let a = sequencer.add_log(make_log(5, LogKind::Mint, 0, 1, 10)).unwrap();
        let b = sequencer.add_log(make_log(5, LogKind::Mint, 0, 1, 10)).unwrap();
        assert!(b > a);
    }

    #[test]
    fn test_mint_then_transfer() {
        let mut sequencer = Sequencer::new();
        sequencer
            .add_log(make_log(1, LogKind::Mint, 0, 0xAA, 100))
            .unwrap();
        sequencer
            .add_log(make_log(2, LogKind::Transfer, 0xAA, 0xBB, 40))
            .unwrap();

        let applied = sequencer.process_logs().unwrap();
        assert_eq!(applied, 2);

        let a = sequencer.balance(&token(), &AccountAddress::repeat(0xAA));
        let b = sequencer.balance(&token(), &AccountAddress::repeat(0xBB));
        assert_eq!(a, Amount::from_u64(60));
        assert_eq!(b, Amount::from_u64(40));
    }

    #[test]
    fn test_logs_apply_in_timestamp_order() {
        let mut sequencer = Sequencer::new();
        // Enqueued out of order: the transfer arrives first but is
        // timestamped after the mint that funds it.
        sequencer
            .add_log(make_log(9, LogKind::Transfer, 0xAA, 0xBB, 30))
            .unwrap();
        sequencer
            .add_log(make_log(1, LogKind::Mint, 0, 0xAA, 30))
            .unwrap();

        sequencer.process_logs().unwrap();

        let b = sequencer.balance(&token(), &AccountAddress::repeat(0xBB));
        assert_eq!(b, Amount::from_u64(30));
    }

    #[test]
    fn test_unsigned_log_is_dropped() {
        let mut sequencer = Sequencer::new();
        let mut log = make_log(1, LogKind::Mint, 0, 0xAA, 100);
        log.signature = [0u8; 65];
        sequencer.add_log(log).unwrap();

        let applied = sequencer.process_logs().unwrap();
        assert_eq!(applied, 0);
        assert_eq!(
            sequencer.balance(&token(), &AccountAddress::repeat(0xAA)),
            Amount::ZERO
        );
    }

    #[test]
    fn test_burn_underflow_is_skipped() {
        let mut sequencer = Sequencer::new();
        sequencer
            .add_log(make_log(1, LogKind::Mint, 0, 0xAA, 10))
            .unwrap();
        sequencer
            .add_log(make_log(2, LogKind::Burn, 0xAA, 0, 50))
            .unwrap();

        sequencer.process_logs().unwrap();
        assert_eq!(
            sequencer.balance(&token(), &AccountAddress::repeat(0xAA)),
            Amount::from_u64(10)
        );
    }

    #[test]
    fn test_approve_moves_no_balance() {
        let mut sequencer = Sequencer::new();
        sequencer
            .add_log(make_log(1, LogKind::Mint, 0, 0xAA, 10))
            .unwrap();
        let root_before = sequencer.process_logs().and_then(|_| sequencer.token_root(&token())).unwrap();

        sequencer
            .add_log(make_log(2, LogKind::Approve, 0xAA, 0xBB, 5))
            .unwrap();
        sequencer.process_logs().unwrap();

        assert_eq!(sequencer.token_root(&token()).unwrap(), root_before);
    }

    #[test]
    fn test_reprocessing_is_idempotent() {
        let mut sequencer = Sequencer::new();
        sequencer
            .add_log(make_log(1, LogKind::Mint, 0, 0xAA, 10))
            .unwrap();

        sequencer.process_logs().unwrap();
        let applied_again = sequencer.process_logs().unwrap();

        assert_eq!(applied_again, 0);
        assert_eq!(
            sequencer.balance(&token(), &AccountAddress::repeat(0xAA)),
            Amount::from_u64(10)
        );
    }

    #[test]
    fn test_queue_capacity() {
        let mut sequencer = Sequencer::new();
        for _ in 0..MAX_SEQUENCER_LOGS {
            sequencer.add_log(make_log(1, LogKind::Mint, 0, 1, 1)).unwrap();
        }
        assert!(matches!(
            sequencer.add_log(make_log(1, LogKind::Mint, 0, 1, 1)),
            Err(SequencerError::LogQueueFull { .. })
        ));
    }
}
