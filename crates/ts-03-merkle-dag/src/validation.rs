//! # Transaction Validation
//!
//! A transaction is the set of operations sharing one tx id. Validation
//! replays the whole set against a sandbox copy of the trie balances:
//! nothing is written back, and the first violated rule fails every
//! operation in the set.
//!
//! Rules, in replay order:
//! - SUBTRACT from an account that did not exist before the transaction
//!   fails.
//! - SUBTRACT that underflows (final borrow) fails.
//! - A balance left at exactly zero by a SUBTRACT fails.
//! - ADD wraps on 256 bits; SET overwrites unconditionally.

use primitive_types::U256;
use shared_types::{balance_key, OpKind, Operation};
use ts_01_state_trie::PatriciaTrie;

/// Conflict predicate: same `(token, account)` and a type pair in
/// {(ADD,SUB), (SUB,ADD), (SUB,SUB)}. SET never conflicts.
pub fn is_conflict(a: &Operation, b: &Operation) -> bool {
    if a.token != b.token || a.account != b.account {
        return false;
    }

    matches!(
        (a.kind, b.kind),
        (OpKind::Add, OpKind::Subtract)
            | (OpKind::Subtract, OpKind::Add)
            | (OpKind::Subtract, OpKind::Subtract)
    )
}

/// Sandbox balance: seeded from the trie once per touched key; `existed`
/// is frozen at seed time.
struct SandboxBalance {
    key: Vec<u8>,
    balance: U256,
    existed: bool,
}

/// Replay `operations` against `token_tree` without mutating it. Returns
/// false as soon as any rule is violated.
pub fn validate_tx(operations: &[Operation], token_tree: &PatriciaTrie) -> bool {
    if operations.is_empty() {
        return false;
    }

    let mut sandbox: Vec<SandboxBalance> = Vec::with_capacity(operations.len());
    for op in operations {
        let key = balance_key(&op.account, &op.token);
        if sandbox.iter().any(|entry| entry.key == key) {
            continue;
        }

        let (balance, existed) = match token_tree.get(&key) {
            Some(bytes) => (U256::from_big_endian(bytes), true),
            None => (U256::zero(), false),
        };
        sandbox.push(SandboxBalance { key, balance, existed });
    }

    for op in operations {
        let key = balance_key(&op.account, &op.token);
        let entry = match sandbox.iter_mut().find(|entry| entry.key == key) {
            Some(entry) => entry,
            None => continue,
        };

        match op.kind {
            OpKind::Add => {
                let (sum, _carry) = entry.balance.overflowing_add(op.amount.to_u256());
                entry.balance = sum;
            }
            OpKind::Subtract => {
                if !entry.existed {
                    return false;
                }
                entry.balance = match entry.balance.checked_sub(op.amount.to_u256()) {
                    Some(diff) => diff,
                    None => return false,
                };
                if entry.balance.is_zero() {
                    return false;
                }
            }
            OpKind::Set => {
                entry.balance = op.amount.to_u256();
            }
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{AccountAddress, Amount, TokenAddress};

    fn make_op(operation_id: u64, kind: OpKind, account: u8, amount: u64) -> Operation {
        Operation::new(
            operation_id,
            7,
            10,
            kind,
            TokenAddress::repeat(0x11),
            AccountAddress::repeat(account),
            Amount::from_u64(amount),
        )
    }

    fn trie_with_balance(account: u8, amount: u64) -> PatriciaTrie {
        let mut trie = PatriciaTrie::new();
        let key = balance_key(&AccountAddress::repeat(account), &TokenAddress::repeat(0x11));
        trie.insert(&key, Amount::from_u64(amount).as_bytes()).unwrap();
        trie
    }

    #[test]
    fn test_conflict_predicate() {
        let add = make_op(1, OpKind::Add, 0xAA, 5);
        let sub = make_op(2, OpKind::Subtract, 0xAA, 5);
        let set = make_op(3, OpKind::Set, 0xAA, 5);
        let other_account = make_op(4, OpKind::Subtract, 0xAB, 5);

        assert!(is_conflict(&add, &sub));
        assert!(is_conflict(&sub, &add));
        assert!(is_conflict(&sub, &sub));
        assert!(!is_conflict(&add, &add));
        assert!(!is_conflict(&set, &sub));
        assert!(!is_conflict(&set, &set));
        assert!(!is_conflict(&sub, &other_account));
    }

    #[test]
    fn test_transfer_pair_succeeds() {
        let trie = trie_with_balance(0xAA, 100);
        let ops = [
            make_op(1, OpKind::Subtract, 0xAA, 10),
            make_op(2, OpKind::Add, 0xBB, 10),
        ];
        assert!(validate_tx(&ops, &trie));
    }

    #[test]
    fn test_overdraft_fails() {
        let trie = trie_with_balance(0xAA, 5);
        let ops = [
            make_op(1, OpKind::Subtract, 0xAA, 10),
            make_op(2, OpKind::Add, 0xBB, 10),
        ];
        assert!(!validate_tx(&ops, &trie));
    }

    #[test]
    fn test_balance_reaching_zero_fails() {
        // One SUB draining the account exactly is rejected.
        let trie = trie_with_balance(0xAA, 10);
        let ops = [make_op(1, OpKind::Subtract, 0xAA, 10)];
        assert!(!validate_tx(&ops, &trie));
    }

    #[test]
    fn test_sub_from_missing_account_fails() {
        let trie = PatriciaTrie::new();
        let ops = [make_op(1, OpKind::Subtract, 0xAA, 1)];
        assert!(!validate_tx(&ops, &trie));
    }

    #[test]
    fn test_add_then_sub_on_fresh_account_fails() {
        // The account did not exist before the transaction, so the SUB leg
        // is refused even though the ADD leg funded it in the sandbox.
        let trie = PatriciaTrie::new();
        let ops = [
            make_op(1, OpKind::Add, 0xAA, 10),
            make_op(2, OpKind::Subtract, 0xAA, 10),
        ];
        assert!(!validate_tx(&ops, &trie));
    }

    #[test]
    fn test_set_overwrites_without_conflict_rules() {
        let trie = PatriciaTrie::new();
        let ops = [make_op(1, OpKind::Set, 0xAA, 0)];
        assert!(validate_tx(&ops, &trie));
    }

    #[test]
    fn test_sandbox_does_not_touch_trie() {
        let trie = trie_with_balance(0xAA, 100);
        let root_before = trie.root_hash();

        let ops = [make_op(1, OpKind::Subtract, 0xAA, 10)];
        validate_tx(&ops, &trie);

        assert_eq!(trie.root_hash(), root_before);
    }

    #[test]
    fn test_empty_tx_is_invalid() {
        assert!(!validate_tx(&[], &PatriciaTrie::new()));
    }
}
