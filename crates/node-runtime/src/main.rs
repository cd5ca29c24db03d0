//! # TEE-Settle Node Runtime
//!
//! Demo entry point: an in-process settlement cluster fed by the L2
//! simulator. Each epoch ingests a batch of simulated operations, closes
//! over the commitment triple, ratifies it by majority and broadcasts it
//! back toward the chains.

use anyhow::Result;
use node_runtime::ClusterHarness;
use shared_crypto::OsEntropy;
use shared_types::{AccountAddress, TokenAddress, TxRequest};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use ts_07_l2_sync::{L2Simulator, OperationEvent};

/// Node configuration.
pub struct NodeConfig {
    /// Number of in-process replicas.
    pub node_count: usize,
    /// Epochs to run before exiting.
    pub epochs: u64,
    /// Simulated operations ingested per epoch.
    pub events_per_epoch: usize,
    /// Harness steps allowed for leader election.
    pub election_budget: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_count: 3,
            epochs: 2,
            events_per_epoch: 8,
            election_budget: 800,
        }
    }
}

fn spawn_simulator(token: TokenAddress) -> (mpsc::Receiver<OperationEvent>, Arc<AtomicBool>) {
    let mut simulator = L2Simulator::new(Box::new(OsEntropy));
    simulator.add_chain(1, "rollup-one").expect("chain capacity");
    simulator.add_chain(2, "rollup-two").expect("chain capacity");

    let accounts = vec![
        AccountAddress::repeat(0xA1),
        AccountAddress::repeat(0xB2),
        AccountAddress::repeat(0xC3),
    ];

    let (sender, receiver) = mpsc::sync_channel(256);
    let stop = Arc::new(AtomicBool::new(false));
    let thread_stop = Arc::clone(&stop);
    std::thread::spawn(move || {
        simulator.run_background(
            sender,
            Duration::from_millis(2),
            thread_stop,
            token,
            accounts,
        );
    });

    (receiver, stop)
}

fn run_epoch(
    harness: &mut ClusterHarness,
    receiver: &mpsc::Receiver<OperationEvent>,
    epoch_id: u64,
    events_per_epoch: usize,
) -> Result<()> {
    for node in &mut harness.nodes {
        node.start_epoch(epoch_id)?;
    }

    // Ingest one batch of simulated L2 events.
    let mut events = Vec::with_capacity(events_per_epoch);
    while events.len() < events_per_epoch {
        match receiver.recv_timeout(Duration::from_secs(5)) {
            Ok(event) => events.push(event),
            Err(err) => {
                warn!(%err, "simulator went quiet");
                break;
            }
        }
    }

    // The leader orders the owning transactions and distributes the
    // order before anyone builds the DAG.
    let leader = harness.leader_index().expect("leader elected");
    for event in &events {
        let tx = TxRequest {
            tx_id: event.tx_id,
            timestamp: event.timestamp,
            from: event.account,
            to: event.account,
            token: event.token,
            amount: event.amount,
            signature: [1u8; 65],
            chain_id: event.chain_id,
            is_processed: false,
        };
        harness.nodes[leader].add_tx_request(tx)?;
    }
    harness.nodes[leader].sort_txs()?;
    harness.route();

    // Every replica ingests the operations; rejected transactions stay
    // in the DAG and count toward the reject root.
    for event in &events {
        let Some(op) = event.to_operation() else {
            warn!(op_type = event.op_type, "unknown operation type");
            continue;
        };
        for (i, node) in harness.nodes.iter_mut().enumerate() {
            let outcome = if i == leader {
                node.process_operation(event.chain_id, &op)
            } else {
                node.listen_and_build_dag(event.chain_id, &op)
            };
            if let Err(err) = outcome {
                if i == leader {
                    info!(tx_id = op.tx_id, code = err.code(), "operation rejected");
                }
            }
        }
    }

    // Confirmations come back from the chains.
    for event in &events {
        for node in &mut harness.nodes {
            node.add_executed_tx(event.tx_id, event.chain_id, event.timestamp / 2, 0)?;
        }
    }

    for node in &mut harness.nodes {
        node.end_epoch()?;
    }

    // Everyone submits a signed output; the leader ratifies and syncs.
    for node in &mut harness.nodes {
        node.generate_and_send_epoch_output()?;
    }
    harness.route();

    let ratified = harness.nodes[leader].leader_collect_epoch_outputs()?;
    harness.nodes[leader].leader_broadcast_tx_set()?;
    harness.route();
    let synced = harness.nodes[leader].leader_sync_to_l2_chains()?;
    harness.route();

    info!(
        epoch = epoch_id,
        state_root = %hex::encode(ratified.state_root),
        dag_head = %hex::encode(ratified.dag_head),
        reject_root = %hex::encode(ratified.reject_root),
        "epoch ratified"
    );
    debug_assert_eq!(synced.state_root, ratified.state_root);

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("===========================================");
    info!("  TEE-Settle Node Runtime v0.1.0");
    info!("===========================================");

    let config = NodeConfig::default();
    info!(
        nodes = config.node_count,
        epochs = config.epochs,
        "bootstrapping in-process cluster"
    );

    let mut harness = ClusterHarness::new(config.node_count, 0xC0FFEE);
    let leader = harness
        .run_until_leader(config.election_budget)
        .ok_or_else(|| anyhow::anyhow!("no leader within the election budget"))?;
    info!(leader, "leader elected");

    let token = TokenAddress::repeat(0x11);
    for node in &mut harness.nodes {
        node.register_token(&token, 1, &shared_crypto::sha256(b"demo-token-deploy"))?;
        node.sync_l2_block_headers(1, 1, 64)?;
    }

    let (receiver, stop) = spawn_simulator(token);

    for epoch_id in 1..=config.epochs {
        run_epoch(&mut harness, &receiver, epoch_id, config.events_per_epoch)?;
        // Yield so the runtime stays cooperative even in this demo loop.
        tokio::task::yield_now().await;
    }

    stop.store(true, Ordering::Relaxed);
    info!("demo complete, shutting down");
    Ok(())
}
