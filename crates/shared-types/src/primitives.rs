//! # Fixed-Width Primitives
//!
//! Identifiers and fixed-width byte containers used across the cluster.
//! Balances are 256-bit big-endian at rest; arithmetic goes through `U256`.

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};

/// Replica identifier within the cluster (small integer).
pub type NodeId = u32;

/// Identifier of an observed L2 chain.
pub type ChainId = u32;

/// Grouping key shared by the legs of one L2 transaction.
pub type TxId = u64;

/// Producer-assigned unique operation identifier.
pub type OperationId = u64;

/// Epoch counter.
pub type EpochId = u64;

/// 256-bit digest output.
pub type Hash32 = [u8; 32];

/// The all-zero digest, used for empty commitments.
pub const ZERO_HASH: Hash32 = [0u8; 32];

/// 42-byte token tag (chain-prefixed hex address form).
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenAddress(#[serde_as(as = "Bytes")] pub [u8; 42]);

impl TokenAddress {
    pub const LEN: usize = 42;

    pub fn as_bytes(&self) -> &[u8; 42] {
        &self.0
    }

    /// Token tag with every byte set to `fill`; handy for fixtures.
    pub fn repeat(fill: u8) -> Self {
        Self([fill; 42])
    }
}

/// 20-byte account address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountAddress(pub [u8; 20]);

impl AccountAddress {
    pub const LEN: usize = 20;

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn repeat(fill: u8) -> Self {
        Self([fill; 20])
    }
}

/// 32-byte big-endian unsigned balance / transfer amount.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount(pub [u8; 32]);

impl Amount {
    pub const ZERO: Amount = Amount([0u8; 32]);

    pub fn from_u64(value: u64) -> Self {
        Self::from_u256(U256::from(value))
    }

    pub fn from_u256(value: U256) -> Self {
        let mut bytes = [0u8; 32];
        value.to_big_endian(&mut bytes);
        Self(bytes)
    }

    pub fn to_u256(&self) -> U256 {
        U256::from_big_endian(&self.0)
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// The 62-byte balance-trie key `account ‖ token`.
pub fn balance_key(account: &AccountAddress, token: &TokenAddress) -> Vec<u8> {
    let mut key = Vec::with_capacity(AccountAddress::LEN + TokenAddress::LEN);
    key.extend_from_slice(&account.0);
    key.extend_from_slice(&token.0);
    key
}
