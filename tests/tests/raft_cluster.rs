//! Raft behavior over the real wire layer: election, replication across
//! a partition, and commit convergence after healing.

use node_runtime::ClusterHarness;
use ts_04_consensus::LogEntry;

const ELECTION_BUDGET: usize = 800;

#[test]
fn test_three_node_election_over_the_wire() {
    let mut harness = ClusterHarness::new(3, 0xBEEF);
    let leader = harness.run_until_leader(ELECTION_BUDGET).expect("leader");

    // Exactly one leader, and every replica agrees on it.
    assert_eq!(
        harness.nodes.iter().filter(|n| n.is_leader()).count(),
        1
    );
    harness.step_n(60);
    for node in &harness.nodes {
        assert_eq!(node.current_leader(), Some(leader));
    }
}

#[test]
fn test_wire_heartbeats_update_roster() {
    let mut harness = ClusterHarness::new(3, 0xAB1E);
    harness.run_until_leader(ELECTION_BUDGET).expect("leader");

    let reached = harness.nodes[0].send_heartbeat().unwrap();
    assert_eq!(reached, 2);
    harness.route();

    let sender_id = harness.nodes[0].node_id();
    for node in &harness.nodes[1..] {
        let entry = node
            .nodes()
            .iter()
            .find(|n| n.node_id == sender_id)
            .unwrap();
        assert!(entry.last_heartbeat > 0, "heartbeat not recorded");
    }
}

#[test]
fn test_partitioned_minority_catches_up() {
    let mut harness = ClusterHarness::new(3, 0xFACE);

    // Partition node 3 on both sides of the cut. Its loop is suspended
    // while partitioned, like a stalled enclave.
    for node in &mut harness.nodes {
        if node.node_id() != 3 {
            node.set_peer_active(3, false);
        }
    }

    let mut leader = None;
    for _ in 0..ELECTION_BUDGET {
        for node in &mut harness.nodes {
            if node.node_id() != 3 {
                node.elect_leader().unwrap();
            }
        }
        harness.route();
        leader = harness.leader_index();
        if leader.is_some() {
            break;
        }
    }
    let leader = leader.expect("majority side elected a leader");
    assert_ne!(harness.nodes[leader].node_id(), 3);

    // Commit an entry on the majority side.
    let raft_log_entry = LogEntry {
        term: 0,
        index: 0,
        tx_id: 42,
        timestamp: 0,
        data: vec![7; 16],
    };
    harness.nodes[leader].raft_append(raft_log_entry).unwrap();

    for _ in 0..200 {
        for node in &mut harness.nodes {
            if node.node_id() != 3 {
                node.elect_leader().unwrap();
            }
        }
        harness.route();
    }
    assert!(harness.nodes[leader].raft().commit_index() >= 1);

    // Heal the partition; node 3 receives the entry within a few
    // heartbeat rounds.
    for node in &mut harness.nodes {
        if node.node_id() != 3 {
            node.set_peer_active(3, true);
        }
    }
    harness.step_n(200);

    let node3 = harness.nodes.iter().find(|n| n.node_id() == 3).unwrap();
    assert_eq!(node3.raft().log().len(), 1);
    assert_eq!(node3.raft().log()[0].tx_id, 42);
    assert!(node3.raft().commit_index() >= 1);

    // And all three now agree on the committed prefix.
    for node in &harness.nodes {
        assert!(node.raft().commit_index() >= 1);
        assert_eq!(node.raft().log()[0].tx_id, 42);
    }
}
