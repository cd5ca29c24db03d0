//! Shared fixtures for the integration suite.

use shared_types::{AccountAddress, Amount, OpKind, Operation, TokenAddress};

/// The token every scenario settles against.
pub fn demo_token() -> TokenAddress {
    TokenAddress::repeat(0x11)
}

pub fn account(fill: u8) -> AccountAddress {
    AccountAddress::repeat(fill)
}

pub fn make_op(op_id: u64, tx_id: u64, kind: OpKind, acct: u8, amount: u64) -> Operation {
    Operation::new(
        op_id,
        tx_id,
        10,
        kind,
        demo_token(),
        account(acct),
        Amount::from_u64(amount),
    )
}
