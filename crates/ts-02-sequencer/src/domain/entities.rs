//! Sequencer log records.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use shared_types::{AccountAddress, Amount, TokenAddress};

/// Raw L2 token-event kinds handled by the fallback path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogKind {
    Transfer = 0,
    Approve = 1,
    Mint = 2,
    Burn = 3,
}

/// One raw L2 log queued for sequencing.
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLog {
    /// Assigned at enqueue time, strictly increasing.
    pub sequence_id: u64,
    /// Producer clock, primary sort key.
    pub timestamp: u64,
    pub kind: LogKind,
    pub token: TokenAddress,
    pub from: AccountAddress,
    pub to: AccountAddress,
    pub amount: Amount,
    /// Submitter signature; the fallback path only requires it to be
    /// non-empty.
    #[serde_as(as = "Bytes")]
    pub signature: [u8; 65],
    pub processed: bool,
}

impl TokenLog {
    /// Unsequenced log awaiting [`add_log`](crate::Sequencer::add_log).
    pub fn new(
        timestamp: u64,
        kind: LogKind,
        token: TokenAddress,
        from: AccountAddress,
        to: AccountAddress,
        amount: Amount,
        signature: [u8; 65],
    ) -> Self {
        Self {
            sequence_id: 0,
            timestamp,
            kind,
            token,
            from,
            to,
            amount,
            signature,
            processed: false,
        }
    }
}
