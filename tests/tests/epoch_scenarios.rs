//! End-to-end epoch scenarios on a three-node in-process cluster:
//! mint-only, two-leg transfer, overdraft rejection and full majority
//! ratification with L2 sync.

use node_runtime::ClusterHarness;
use shared_crypto::{sha256, sha256_concat};
use shared_types::{Amount, OpKind};
use ts_tests::{account, demo_token, make_op};

const ELECTION_BUDGET: usize = 800;

fn ratified_harness() -> (ClusterHarness, usize) {
    let mut harness = ClusterHarness::new(3, 0x5EED);
    harness
        .run_until_leader(ELECTION_BUDGET)
        .expect("leader within budget");
    let leader = harness.leader_index().unwrap();

    for node in &mut harness.nodes {
        node.register_token(&demo_token(), 1, &sha256(b"deploy")).unwrap();
    }
    (harness, leader)
}

/// Drive one operation into every node (leader first).
fn ingest_everywhere(
    harness: &mut ClusterHarness,
    leader: usize,
    op: &shared_types::Operation,
) -> Result<(), ts_06_cluster::ClusterError> {
    let mut outcome = Ok(());
    for (i, node) in harness.nodes.iter_mut().enumerate() {
        let result = if i == leader {
            node.process_operation(1, op)
        } else {
            node.listen_and_build_dag(1, op)
        };
        if i == leader {
            outcome = result;
        }
    }
    outcome
}

#[test]
fn test_mint_only_epoch() {
    let (mut harness, leader) = ratified_harness();

    for node in &mut harness.nodes {
        node.start_epoch(1).unwrap();
    }

    let mint = make_op(1, 1, OpKind::Add, 0xA1, 100);
    ingest_everywhere(&mut harness, leader, &mint).unwrap();

    let (state_root, dag_head, reject_root) =
        harness.nodes[leader].generate_epoch_output().unwrap();

    // The trie holds (A ‖ T) ↦ 100 and the state root commits to it.
    assert_eq!(
        harness.nodes[leader].balance(&demo_token(), &account(0xA1)),
        Amount::from_u64(100)
    );
    let trie_root = harness.nodes[leader].token_root(&demo_token()).unwrap();
    assert_eq!(state_root, sha256(&trie_root));

    // The head commits to the lone operation.
    let dag = harness.nodes[leader].dag();
    let merkle = dag.get(dag.idx_of(1).unwrap()).merkle_hash;
    assert_eq!(dag_head, sha256(&merkle));

    assert_eq!(reject_root, [0u8; 32]);
}

#[test]
fn test_transfer_epoch_settles_both_legs() {
    let (mut harness, leader) = ratified_harness();

    // Prior state: A holds 100.
    let seed = make_op(900, 900, OpKind::Set, 0xAA, 100);
    ingest_everywhere(&mut harness, leader, &seed).unwrap();
    for node in &mut harness.nodes {
        node.generate_epoch_output().unwrap();
    }

    ingest_everywhere(&mut harness, leader, &make_op(1, 7, OpKind::Subtract, 0xAA, 10)).unwrap();
    ingest_everywhere(&mut harness, leader, &make_op(2, 7, OpKind::Add, 0xBB, 10)).unwrap();

    for node in &mut harness.nodes {
        let (_, _, reject_root) = node.generate_epoch_output().unwrap();
        assert_eq!(reject_root, [0u8; 32]);
        assert_eq!(node.balance(&demo_token(), &account(0xAA)), Amount::from_u64(90));
        assert_eq!(node.balance(&demo_token(), &account(0xBB)), Amount::from_u64(10));
    }
}

#[test]
fn test_overdraft_epoch_rejects_whole_tx() {
    let (mut harness, leader) = ratified_harness();

    let seed = make_op(900, 900, OpKind::Set, 0xAA, 5);
    ingest_everywhere(&mut harness, leader, &seed).unwrap();
    for node in &mut harness.nodes {
        node.generate_epoch_output().unwrap();
    }

    let sub = make_op(1, 7, OpKind::Subtract, 0xAA, 10);
    let add = make_op(2, 7, OpKind::Add, 0xBB, 10);
    assert!(ingest_everywhere(&mut harness, leader, &sub).is_err());
    assert!(ingest_everywhere(&mut harness, leader, &add).is_err());

    for node in &mut harness.nodes {
        let (_, _, reject_root) = node.generate_epoch_output().unwrap();

        // Balances untouched.
        assert_eq!(node.balance(&demo_token(), &account(0xAA)), Amount::from_u64(5));
        assert_eq!(node.balance(&demo_token(), &account(0xBB)), Amount::ZERO);

        // Reject root covers both legs.
        let failed = node.dag().failed_node_hashes();
        assert_eq!(failed.len(), 2);
        assert_eq!(reject_root, sha256_concat(&[&failed[0], &failed[1]]));
    }
}

#[test]
fn test_epoch_ratification_and_l2_sync() {
    let (mut harness, leader) = ratified_harness();

    for node in &mut harness.nodes {
        node.start_epoch(1).unwrap();
    }

    ingest_everywhere(&mut harness, leader, &make_op(1, 1, OpKind::Add, 0xA1, 100)).unwrap();

    for node in &mut harness.nodes {
        node.end_epoch().unwrap();
    }

    // All three outputs travel to the leader.
    for node in &mut harness.nodes {
        node.generate_and_send_epoch_output().unwrap();
    }
    harness.route();

    let ratified = harness.nodes[leader].leader_collect_epoch_outputs().unwrap();
    assert!(harness.nodes[leader].epoch_output_collected());
    assert_eq!(harness.nodes[leader].epoch_outputs().len(), 3);

    // The ratified triple goes back to the chains and followers record
    // it.
    let synced = harness.nodes[leader].leader_sync_to_l2_chains().unwrap();
    assert_eq!(synced.epoch_id, 1);
    assert_eq!(synced.dag_head, ratified.dag_head);
    assert_eq!(synced.state_root, ratified.state_root);
    assert_eq!(synced.reject_root, ratified.reject_root);
    harness.route();

    for (i, node) in harness.nodes.iter().enumerate() {
        if i != leader {
            let seen = node.last_ratified().expect("followers saw the sync");
            assert_eq!(seen.state_root, ratified.state_root);
        }
    }
}

#[test]
fn test_minority_of_divergent_outputs_is_outvoted() {
    let (mut harness, leader) = ratified_harness();

    for node in &mut harness.nodes {
        node.start_epoch(1).unwrap();
    }

    // One follower diverges: it never sees the operation.
    let divergent = (0..harness.nodes.len())
        .find(|i| *i != leader)
        .unwrap();
    let op = make_op(1, 1, OpKind::Add, 0xA1, 100);
    for (i, node) in harness.nodes.iter_mut().enumerate() {
        if i == divergent {
            continue;
        }
        let _ = if i == leader {
            node.process_operation(1, &op)
        } else {
            node.listen_and_build_dag(1, &op)
        };
    }

    for node in &mut harness.nodes {
        node.end_epoch().unwrap();
        node.generate_and_send_epoch_output().unwrap();
    }
    harness.route();

    let ratified = harness.nodes[leader].leader_collect_epoch_outputs().unwrap();

    // The majority triple is the one with the operation, not the
    // divergent empty one.
    let expected = {
        let dag = harness.nodes[leader].dag();
        sha256(&dag.get(dag.idx_of(1).unwrap()).merkle_hash)
    };
    assert_eq!(ratified.dag_head, expected);
}

#[test]
fn test_tx_set_broadcast_collects_countersignatures() {
    let (mut harness, leader) = ratified_harness();

    // Every replica observed the same confirmations.
    for node in &mut harness.nodes {
        node.add_executed_tx(5, 1, 100, 0).unwrap();
        node.add_executed_tx(6, 2, 101, 3).unwrap();
    }

    let broadcast = harness.nodes[leader].leader_broadcast_tx_set().unwrap();
    assert_eq!(broadcast, 2);
    harness.route();

    // Both followers verified the set, logged it and countersigned.
    assert_eq!(harness.nodes[leader].tx_set_signatures().len(), 2);
    for (i, node) in harness.nodes.iter().enumerate() {
        if i != leader {
            assert_eq!(node.raft().log().len(), 1);
        }
    }
}

#[test]
fn test_sorted_broadcast_reaches_followers() {
    let (mut harness, leader) = ratified_harness();

    for tx_id in [3u64, 1, 2] {
        let tx = shared_types::TxRequest {
            tx_id,
            timestamp: tx_id * 10,
            from: account(0xAA),
            to: account(0xBB),
            token: demo_token(),
            amount: Amount::from_u64(1),
            signature: [1u8; 65],
            chain_id: 1,
            is_processed: false,
        };
        harness.nodes[leader].add_tx_request(tx).unwrap();
    }

    harness.nodes[leader].sort_txs().unwrap();
    harness.route();

    for node in &harness.nodes {
        assert_eq!(node.get_tx_sort_order(1), Some(0));
        assert_eq!(node.get_tx_sort_order(2), Some(1));
        assert_eq!(node.get_tx_sort_order(3), Some(2));
    }
}
