//! The single-node sequencer fallback: deterministic ordering and root
//! agreement between independently fed instances.

use shared_types::{Amount, TokenAddress};
use ts_02_sequencer::{LogKind, Sequencer, TokenLog};
use ts_tests::{account, demo_token};

fn make_log(timestamp: u64, kind: LogKind, from: u8, to: u8, amount: u64) -> TokenLog {
    TokenLog::new(
        timestamp,
        kind,
        demo_token(),
        account(from),
        account(to),
        Amount::from_u64(amount),
        [1u8; 65],
    )
}

#[test]
fn test_two_sequencers_agree_despite_arrival_order() {
    let logs = [
        make_log(1, LogKind::Mint, 0, 0xAA, 100),
        make_log(2, LogKind::Transfer, 0xAA, 0xBB, 30),
        make_log(3, LogKind::Approve, 0xAA, 0xBB, 5),
        make_log(4, LogKind::Burn, 0xBB, 0, 10),
    ];

    let mut forward = Sequencer::new();
    for log in &logs {
        forward.add_log(*log).unwrap();
    }
    forward.process_logs().unwrap();

    // The second instance receives the same logs out of order; the
    // timestamp sort restores the same history.
    let mut shuffled = Sequencer::new();
    for index in [2usize, 0, 3, 1] {
        shuffled.add_log(logs[index]).unwrap();
    }
    shuffled.process_logs().unwrap();

    assert_eq!(
        forward.token_root(&demo_token()).unwrap(),
        shuffled.token_root(&demo_token()).unwrap()
    );
    assert_eq!(
        forward.balance(&demo_token(), &account(0xAA)),
        Amount::from_u64(70)
    );
    assert_eq!(
        forward.balance(&demo_token(), &account(0xBB)),
        Amount::from_u64(20)
    );
}

#[test]
fn test_sequencer_and_cluster_share_the_trie_contract() {
    // The fallback path and the cluster path commit the same map to the
    // same root when fed equivalent state.
    use shared_crypto::{NodeKeypair, SeededEntropy};
    use shared_types::{OpKind, Operation};
    use ts_06_cluster::SettlementCluster;

    let mut sequencer = Sequencer::new();
    sequencer.add_log(make_log(1, LogKind::Mint, 0, 0xAA, 100)).unwrap();
    sequencer.process_logs().unwrap();

    let mut cluster = SettlementCluster::new(
        1,
        NodeKeypair::from_seed([1u8; 32]),
        Box::new(SeededEntropy::new(1)),
        Box::new(SeededEntropy::new(2)),
    );
    let op = Operation::new(
        1,
        1,
        1,
        OpKind::Add,
        demo_token(),
        account(0xAA),
        Amount::from_u64(100),
    );
    cluster.process_operation(1, &op).unwrap();
    cluster.generate_epoch_output().unwrap();

    assert_eq!(
        sequencer.token_root(&demo_token()).unwrap(),
        cluster.token_root(&demo_token()).unwrap()
    );
}

#[test]
fn test_multiple_tokens_roots_are_independent() {
    let other_token = TokenAddress::repeat(0x22);
    let mut sequencer = Sequencer::new();

    sequencer.add_log(make_log(1, LogKind::Mint, 0, 0xAA, 10)).unwrap();
    let mut other = make_log(2, LogKind::Mint, 0, 0xAA, 10);
    other.token = other_token;
    sequencer.add_log(other).unwrap();
    sequencer.process_logs().unwrap();

    let root_a = sequencer.token_root(&demo_token()).unwrap();
    let root_b = sequencer.token_root(&other_token).unwrap();
    // Same balances, same account, different token tag in the key.
    assert_ne!(root_a, root_b);
}
