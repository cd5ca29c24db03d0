//! DAG convergence between replicas: node push, missing-parent
//! re-request, periodic broadcast, and whole-DAG reconciliation.

use node_runtime::ClusterHarness;
use shared_types::OpKind;
use ts_tests::make_op;

const ELECTION_BUDGET: usize = 800;

fn elected() -> (ClusterHarness, usize) {
    let mut harness = ClusterHarness::new(3, 0xD1CE);
    harness.run_until_leader(ELECTION_BUDGET).expect("leader");
    let leader = harness.leader_index().unwrap();
    (harness, leader)
}

#[test]
fn test_periodic_broadcast_builds_remote_dags() {
    let (mut harness, leader) = elected();

    // Leader ingests a conflicting pair; followers learn it only from
    // the broadcast.
    harness.nodes[leader]
        .process_operation(1, &make_op(1, 1, OpKind::Subtract, 0xAA, 1))
        .ok();
    harness.nodes[leader]
        .process_operation(1, &make_op(2, 2, OpKind::Subtract, 0xAA, 1))
        .ok();

    harness.nodes[leader].periodic_broadcast().unwrap();
    harness.route();

    let expected_root = harness.nodes[leader].dag().compute_root_hash();
    for (i, node) in harness.nodes.iter().enumerate() {
        assert!(node.dag().contains(1), "node {i} missing op 1");
        assert!(node.dag().contains(2), "node {i} missing op 2");
        assert_eq!(node.dag().compute_root_hash(), expected_root);
    }

    // The latest buffer drained; a second round pushes nothing.
    assert_eq!(harness.nodes[leader].periodic_broadcast().unwrap(), 0);
}

#[test]
fn test_orphan_push_triggers_parent_request() {
    let (mut harness, leader) = elected();

    harness.nodes[leader]
        .process_operation(1, &make_op(1, 1, OpKind::Subtract, 0xAA, 1))
        .ok();
    harness.nodes[leader]
        .process_operation(1, &make_op(2, 2, OpKind::Subtract, 0xAA, 1))
        .ok();

    // Push only the child (op 2, descendant of op 1). Followers must
    // park it, re-request the parent, and converge once it arrives.
    harness.nodes[leader].broadcast_dag_node(0, 2).unwrap();
    harness.route();

    let expected_root = harness.nodes[leader].dag().compute_root_hash();
    for (i, node) in harness.nodes.iter().enumerate() {
        assert!(node.dag().contains(1), "node {i} never recovered the parent");
        assert!(node.dag().contains(2), "node {i} dropped the orphan");
        assert_eq!(node.dag().compute_root_hash(), expected_root);
    }
}

#[test]
fn test_direct_dag_reconciliation() {
    use shared_crypto::{NodeKeypair, SeededEntropy};
    use ts_06_cluster::SettlementCluster;

    let make_cluster = |node_id: u32, seed: u64| {
        SettlementCluster::new(
            node_id,
            NodeKeypair::from_seed([node_id as u8; 32]),
            Box::new(SeededEntropy::new(seed)),
            Box::new(SeededEntropy::new(seed + 1)),
        )
    };

    let mut source = make_cluster(1, 5);
    for i in 1..=3u64 {
        // Unfunded debits: rejected by validation but present in the DAG,
        // which is what the sync has to carry over.
        source
            .process_operation(1, &make_op(i, i, OpKind::Subtract, 0xAA, 1))
            .ok();
    }
    // And two independent mints.
    source.process_operation(1, &make_op(10, 10, OpKind::Add, 0xBB, 5)).unwrap();
    source.process_operation(1, &make_op(11, 11, OpKind::Add, 0xCC, 5)).unwrap();

    let mut target = make_cluster(2, 9);
    let inserted = target.sync_all_tee_dags(&source).unwrap();

    assert_eq!(inserted, 5);
    assert_eq!(
        target.dag().compute_root_hash(),
        source.dag().compute_root_hash()
    );
    assert_eq!(target.sync_all_tee_dags(&source).unwrap(), 0);
}
