//! # Raft State Machine
//!
//! Tick-driven, single-threaded, transport-free. Election timeouts are
//! drawn from the injected entropy source so multi-node tests stay
//! deterministic; when entropy fails, the midpoint timeout is used.

use crate::domain::errors::RaftError;
use crate::domain::message::{RaftMessage, RaftRpc};
use crate::domain::state::{LogEntry, PeerState, RaftRole, MAX_ENTRY_DATA};
use shared_crypto::EntropySource;
use shared_types::{EpochId, NodeId};
use std::collections::HashSet;
use tracing::{debug, info};

/// Cluster size cap.
pub const MAX_RAFT_NODES: usize = 16;

/// Log capacity.
pub const MAX_LOG_ENTRIES: usize = 100_000;

/// Election timeout lower bound, in ticks (≈ milliseconds).
pub const ELECTION_TIMEOUT_MIN: u64 = 150;

/// Election timeout upper bound, exclusive.
pub const ELECTION_TIMEOUT_MAX: u64 = 300;

/// Leader heartbeat interval, in ticks.
pub const HEARTBEAT_INTERVAL: u64 = 50;

/// Entry batch cap per AppendEntries. Sized so a full batch of
/// maximum-payload entries still fits one 4096-byte wire envelope;
/// longer suffixes drain over successive heartbeats.
pub const MAX_ENTRIES_PER_MESSAGE: usize = 10;

/// One replica's Raft state.
pub struct Raft {
    node_id: NodeId,
    role: RaftRole,

    // Persistent state (in-memory here; durability is out of scope).
    current_term: u64,
    voted_for: Option<NodeId>,
    log: Vec<LogEntry>,

    // Volatile state.
    commit_index: u64,
    last_applied: u64,
    leader_id: Option<NodeId>,
    peers: Vec<PeerState>,
    votes_received: HashSet<NodeId>,

    // Logical clock, advanced one tick at a time.
    clock: u64,
    last_heartbeat: u64,
    election_timeout: u64,
    entropy: Box<dyn EntropySource>,

    // Epoch hooks.
    current_epoch: EpochId,
    epoch_start_time: u64,
    epoch_in_progress: bool,
}

impl Raft {
    pub fn new(node_id: NodeId, mut entropy: Box<dyn EntropySource>) -> Self {
        let election_timeout = Self::random_timeout(entropy.as_mut());
        Self {
            node_id,
            role: RaftRole::Follower,
            current_term: 0,
            voted_for: None,
            log: Vec::new(),
            commit_index: 0,
            last_applied: 0,
            leader_id: None,
            peers: Vec::new(),
            votes_received: HashSet::new(),
            clock: 0,
            last_heartbeat: 0,
            election_timeout,
            entropy,
            current_epoch: 0,
            epoch_start_time: 0,
            epoch_in_progress: false,
        }
    }

    fn random_timeout(entropy: &mut dyn EntropySource) -> u64 {
        let spread = ELECTION_TIMEOUT_MAX - ELECTION_TIMEOUT_MIN;
        let draw = entropy.next_u64().unwrap_or(spread / 2);
        ELECTION_TIMEOUT_MIN + draw % spread
    }

    // =========================================================================
    // READ SURFACE
    // =========================================================================

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn role(&self) -> RaftRole {
        self.role
    }

    pub fn is_leader(&self) -> bool {
        self.role == RaftRole::Leader
    }

    /// Current leader, if any is known.
    pub fn leader(&self) -> Option<NodeId> {
        self.leader_id
    }

    pub fn current_term(&self) -> u64 {
        self.current_term
    }

    pub fn commit_index(&self) -> u64 {
        self.commit_index
    }

    pub fn last_applied(&self) -> u64 {
        self.last_applied
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    pub fn peers(&self) -> &[PeerState] {
        &self.peers
    }

    /// Committed entries not yet applied, oldest first.
    pub fn committed_entries(&self) -> &[LogEntry] {
        let from = self.last_applied as usize;
        let to = (self.commit_index as usize).min(self.log.len());
        &self.log[from.min(to)..to]
    }

    fn cluster_size(&self) -> usize {
        self.peers.len() + 1
    }

    fn majority(&self) -> usize {
        self.cluster_size() / 2 + 1
    }

    fn last_log_index(&self) -> u64 {
        self.log.len() as u64
    }

    fn last_log_term(&self) -> u64 {
        self.log.last().map(|e| e.term).unwrap_or(0)
    }

    // =========================================================================
    // MEMBERSHIP
    // =========================================================================

    /// Register a peer; idempotent on node id.
    pub fn add_peer(&mut self, node_id: NodeId) -> Result<(), RaftError> {
        if self.peers.iter().any(|p| p.node_id == node_id) {
            return Ok(());
        }
        if self.peers.len() + 1 >= MAX_RAFT_NODES {
            return Err(RaftError::TooManyPeers {
                capacity: MAX_RAFT_NODES,
            });
        }

        let mut peer = PeerState::new(node_id);
        peer.next_index = self.last_log_index() + 1;
        self.peers.push(peer);
        Ok(())
    }

    /// Mark a peer reachable or partitioned.
    pub fn set_peer_active(&mut self, node_id: NodeId, is_active: bool) {
        if let Some(peer) = self.peers.iter_mut().find(|p| p.node_id == node_id) {
            peer.is_active = is_active;
        }
    }

    // =========================================================================
    // TICK
    // =========================================================================

    /// Advance the logical clock one tick and return the messages owed to
    /// the transport.
    pub fn tick(&mut self) -> Vec<RaftMessage> {
        self.clock += 1;

        match self.role {
            RaftRole::Follower | RaftRole::Candidate => {
                if self.clock.saturating_sub(self.last_heartbeat) > self.election_timeout {
                    return self.start_election();
                }
                Vec::new()
            }
            RaftRole::Leader => {
                if self.clock.saturating_sub(self.last_heartbeat) >= HEARTBEAT_INTERVAL {
                    self.last_heartbeat = self.clock;
                    return self.replication_round();
                }
                Vec::new()
            }
        }
    }

    fn start_election(&mut self) -> Vec<RaftMessage> {
        self.role = RaftRole::Candidate;
        self.current_term += 1;
        self.voted_for = Some(self.node_id);
        self.leader_id = None;
        self.votes_received = HashSet::from([self.node_id]);
        self.election_timeout = Self::random_timeout(self.entropy.as_mut());
        self.last_heartbeat = self.clock;

        info!(node = self.node_id, term = self.current_term, "election started");

        // A single-node cluster elects itself on the spot.
        if self.votes_received.len() >= self.majority() {
            return self.become_leader();
        }

        let last_log_index = self.last_log_index();
        let last_log_term = self.last_log_term();
        self.peers
            .iter()
            .filter(|p| p.is_active)
            .map(|p| RaftMessage {
                from: self.node_id,
                to: p.node_id,
                rpc: RaftRpc::RequestVote {
                    term: self.current_term,
                    last_log_index,
                    last_log_term,
                },
            })
            .collect()
    }

    fn become_leader(&mut self) -> Vec<RaftMessage> {
        self.role = RaftRole::Leader;
        self.leader_id = Some(self.node_id);
        self.last_heartbeat = self.clock;

        let next = self.last_log_index() + 1;
        for peer in &mut self.peers {
            peer.next_index = next;
            peer.match_index = 0;
        }

        info!(node = self.node_id, term = self.current_term, "became leader");

        // Assert leadership immediately rather than waiting a heartbeat
        // interval.
        self.replication_round()
    }

    fn become_follower(&mut self, term: u64) {
        self.role = RaftRole::Follower;
        self.current_term = term;
        self.voted_for = None;
        self.leader_id = None;
        self.votes_received.clear();
        self.election_timeout = Self::random_timeout(self.entropy.as_mut());
        self.last_heartbeat = self.clock;
    }

    /// AppendEntries for every active peer, carrying whatever suffix each
    /// one still misses.
    fn replication_round(&mut self) -> Vec<RaftMessage> {
        let mut out = Vec::with_capacity(self.peers.len());
        for peer in &self.peers {
            if !peer.is_active {
                continue;
            }

            let prev_log_index = peer.next_index.saturating_sub(1);
            let prev_log_term = if prev_log_index > 0 {
                self.log[prev_log_index as usize - 1].term
            } else {
                0
            };

            let entries: Vec<LogEntry> = self
                .log
                .iter()
                .skip(prev_log_index as usize)
                .take(MAX_ENTRIES_PER_MESSAGE)
                .cloned()
                .collect();

            out.push(RaftMessage {
                from: self.node_id,
                to: peer.node_id,
                rpc: RaftRpc::AppendEntries {
                    term: self.current_term,
                    prev_log_index,
                    prev_log_term,
                    leader_commit: self.commit_index,
                    entries,
                },
            });
        }
        out
    }

    // =========================================================================
    // MESSAGE HANDLING
    // =========================================================================

    /// Process one inbound RPC, returning any responses (and, on
    /// promotion, the first heartbeat round).
    pub fn handle_message(&mut self, msg: &RaftMessage) -> Vec<RaftMessage> {
        let term = match &msg.rpc {
            RaftRpc::RequestVote { term, .. }
            | RaftRpc::VoteResponse { term, .. }
            | RaftRpc::AppendEntries { term, .. }
            | RaftRpc::AppendResponse { term, .. } => *term,
        };

        // Any message from a newer term demotes the receiver.
        if term > self.current_term {
            self.become_follower(term);
        }

        match &msg.rpc {
            RaftRpc::RequestVote {
                term,
                last_log_index,
                last_log_term,
            } => self.handle_request_vote(msg.from, *term, *last_log_index, *last_log_term),

            RaftRpc::VoteResponse { term, vote_granted } => {
                self.handle_vote_response(msg.from, *term, *vote_granted)
            }

            RaftRpc::AppendEntries {
                term,
                prev_log_index,
                prev_log_term,
                leader_commit,
                entries,
            } => self.handle_append_entries(
                msg.from,
                *term,
                *prev_log_index,
                *prev_log_term,
                *leader_commit,
                entries,
            ),

            RaftRpc::AppendResponse {
                term,
                success,
                match_index,
            } => {
                self.handle_append_response(msg.from, *term, *success, *match_index);
                Vec::new()
            }
        }
    }

    fn handle_request_vote(
        &mut self,
        from: NodeId,
        term: u64,
        last_log_index: u64,
        last_log_term: u64,
    ) -> Vec<RaftMessage> {
        let can_vote = (self.voted_for.is_none() || self.voted_for == Some(from))
            && term >= self.current_term;

        // The candidate's log must be at least as up to date as ours,
        // compared by (last term, last index).
        let log_ok = (last_log_term, last_log_index)
            >= (self.last_log_term(), self.last_log_index());

        let vote_granted = can_vote && log_ok && term == self.current_term;
        if vote_granted {
            self.voted_for = Some(from);
            self.last_heartbeat = self.clock;
            debug!(node = self.node_id, candidate = from, term, "vote granted");
        }

        vec![RaftMessage {
            from: self.node_id,
            to: from,
            rpc: RaftRpc::VoteResponse {
                term: self.current_term,
                vote_granted,
            },
        }]
    }

    fn handle_vote_response(
        &mut self,
        from: NodeId,
        term: u64,
        vote_granted: bool,
    ) -> Vec<RaftMessage> {
        if self.role != RaftRole::Candidate || term != self.current_term || !vote_granted {
            return Vec::new();
        }

        self.votes_received.insert(from);
        if self.votes_received.len() >= self.majority() {
            return self.become_leader();
        }
        Vec::new()
    }

    fn handle_append_entries(
        &mut self,
        from: NodeId,
        term: u64,
        prev_log_index: u64,
        prev_log_term: u64,
        leader_commit: u64,
        entries: &[LogEntry],
    ) -> Vec<RaftMessage> {
        let mut success = false;

        if term == self.current_term {
            if self.role == RaftRole::Candidate {
                self.become_follower(term);
            }
            self.leader_id = Some(from);
            self.last_heartbeat = self.clock;

            // Consistency check at the join point.
            let log_match = if prev_log_index == 0 {
                true
            } else if prev_log_index <= self.last_log_index() {
                self.log[prev_log_index as usize - 1].term == prev_log_term
            } else {
                false
            };

            if log_match {
                for (i, entry) in entries.iter().enumerate() {
                    let position = prev_log_index as usize + i;
                    if position < self.log.len() {
                        if self.log[position].term != entry.term {
                            // Conflicting suffix: truncate ours.
                            self.log.truncate(position);
                        } else {
                            continue;
                        }
                    }
                    if self.log.len() < MAX_LOG_ENTRIES {
                        self.log.push(entry.clone());
                    }
                }

                if leader_commit > self.commit_index {
                    self.commit_index = leader_commit.min(self.last_log_index());
                }
                success = true;
            }
        }

        vec![RaftMessage {
            from: self.node_id,
            to: from,
            rpc: RaftRpc::AppendResponse {
                term: self.current_term,
                success,
                match_index: self.last_log_index(),
            },
        }]
    }

    fn handle_append_response(&mut self, from: NodeId, term: u64, success: bool, match_index: u64) {
        if self.role != RaftRole::Leader || term != self.current_term {
            return;
        }

        let Some(peer) = self.peers.iter_mut().find(|p| p.node_id == from) else {
            return;
        };
        peer.last_heartbeat = self.clock;

        if success {
            peer.match_index = match_index;
            peer.next_index = match_index + 1;
            self.advance_commit_index();
        } else {
            // Back off and retry on the next heartbeat.
            peer.next_index = peer.next_index.saturating_sub(1).max(1);
        }
    }

    /// Commit the highest index replicated on a majority within the
    /// current term.
    fn advance_commit_index(&mut self) {
        for index in ((self.commit_index + 1)..=self.last_log_index()).rev() {
            if self.log[index as usize - 1].term != self.current_term {
                continue;
            }
            let replicas = 1 + self
                .peers
                .iter()
                .filter(|p| p.match_index >= index)
                .count();
            if replicas >= self.majority() {
                self.commit_index = index;
                debug!(node = self.node_id, index, "commit index advanced");
                break;
            }
        }
    }

    // =========================================================================
    // LOG APPENDS
    // =========================================================================

    /// Leader-side append of a client proposal; replicated on following
    /// heartbeats.
    pub fn append_entry(&mut self, entry: LogEntry) -> Result<u64, RaftError> {
        if self.role != RaftRole::Leader {
            return Err(RaftError::NotLeader);
        }
        let index = self.append_local(entry)?;
        // A single-node cluster has its majority already.
        self.advance_commit_index();
        Ok(index)
    }

    /// Append without the leadership gate. Used where the protocol has a
    /// follower record what it countersigned.
    pub fn append_local(&mut self, mut entry: LogEntry) -> Result<u64, RaftError> {
        if self.log.len() >= MAX_LOG_ENTRIES {
            return Err(RaftError::LogFull {
                capacity: MAX_LOG_ENTRIES,
            });
        }
        if entry.data.len() > MAX_ENTRY_DATA {
            return Err(RaftError::EntryTooLarge {
                actual: entry.data.len(),
                limit: MAX_ENTRY_DATA,
            });
        }

        entry.term = self.current_term;
        entry.index = self.last_log_index() + 1;
        let index = entry.index;
        self.log.push(entry);
        Ok(index)
    }

    // =========================================================================
    // EPOCH HOOKS
    // =========================================================================

    /// Open an epoch; refused while one is running.
    pub fn start_epoch(&mut self, epoch_id: EpochId) -> Result<(), RaftError> {
        if self.epoch_in_progress {
            return Err(RaftError::EpochInProgress);
        }
        self.current_epoch = epoch_id;
        self.epoch_start_time = self.clock;
        self.epoch_in_progress = true;
        info!(node = self.node_id, epoch = epoch_id, "epoch started");
        Ok(())
    }

    /// Close the epoch, folding the committed prefix into applied state.
    pub fn end_epoch(&mut self) -> Result<(), RaftError> {
        if !self.epoch_in_progress {
            return Err(RaftError::EpochNotActive);
        }
        self.epoch_in_progress = false;
        self.last_applied = self.commit_index;
        info!(node = self.node_id, epoch = self.current_epoch, "epoch ended");
        Ok(())
    }

    /// True while an epoch is open and nothing committed remains
    /// unapplied.
    pub fn is_epoch_complete(&self) -> bool {
        self.epoch_in_progress && self.last_applied >= self.commit_index
    }

    pub fn current_epoch(&self) -> EpochId {
        self.current_epoch
    }

    pub fn epoch_in_progress(&self) -> bool {
        self.epoch_in_progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::SeededEntropy;

    fn make_raft(node_id: NodeId, seed: u64) -> Raft {
        Raft::new(node_id, Box::new(SeededEntropy::new(seed)))
    }

    fn make_entry(tx_id: u64) -> LogEntry {
        LogEntry {
            term: 0,
            index: 0,
            tx_id,
            timestamp: 0,
            data: vec![1, 2, 3],
        }
    }

    /// Deliver messages between nodes until no traffic remains.
    fn pump(nodes: &mut [Raft], mut inflight: Vec<RaftMessage>) {
        while !inflight.is_empty() {
            let mut next = Vec::new();
            for msg in inflight {
                if let Some(node) = nodes.iter_mut().find(|n| n.node_id() == msg.to) {
                    next.extend(node.handle_message(&msg));
                }
            }
            inflight = next;
        }
    }

    #[test]
    fn test_single_node_elects_itself_within_one_timeout() {
        let mut raft = make_raft(1, 1);

        let mut ticks = 0;
        while !raft.is_leader() {
            raft.tick();
            ticks += 1;
            assert!(ticks <= ELECTION_TIMEOUT_MAX + 1, "no election after max timeout");
        }

        assert_eq!(raft.role(), RaftRole::Leader);
        assert_eq!(raft.leader(), Some(1));
        assert!(ticks > ELECTION_TIMEOUT_MIN);
    }

    #[test]
    fn test_three_node_election() {
        let mut nodes: Vec<Raft> = (1..=3).map(|id| make_raft(id, id as u64 * 17)).collect();
        for i in 0..3 {
            for j in 0..3 {
                if i != j {
                    let peer = nodes[j].node_id();
                    nodes[i].add_peer(peer).unwrap();
                }
            }
        }

        // Tick everyone until one node starts an election and wins it.
        for _ in 0..(ELECTION_TIMEOUT_MAX * 4) {
            let mut traffic = Vec::new();
            for node in nodes.iter_mut() {
                traffic.extend(node.tick());
            }
            pump(&mut nodes, traffic);
            if nodes.iter().any(|n| n.is_leader()) {
                break;
            }
        }

        let leaders: Vec<NodeId> = nodes.iter().filter(|n| n.is_leader()).map(|n| n.node_id()).collect();
        assert_eq!(leaders.len(), 1, "exactly one leader expected");

        // Everyone agrees on the leader after its first heartbeat round.
        let leader = leaders[0];
        for node in &nodes {
            assert_eq!(node.leader(), Some(leader));
        }
    }

    #[test]
    fn test_replication_and_commit() {
        let mut nodes: Vec<Raft> = (1..=3).map(|id| make_raft(id, id as u64 * 31)).collect();
        for i in 0..3 {
            for j in 0..3 {
                if i != j {
                    let peer = nodes[j].node_id();
                    nodes[i].add_peer(peer).unwrap();
                }
            }
        }

        // Elect a leader.
        for _ in 0..(ELECTION_TIMEOUT_MAX * 4) {
            let mut traffic = Vec::new();
            for node in nodes.iter_mut() {
                traffic.extend(node.tick());
            }
            pump(&mut nodes, traffic);
            if nodes.iter().any(|n| n.is_leader()) {
                break;
            }
        }
        let leader_pos = nodes.iter().position(|n| n.is_leader()).unwrap();

        // Propose an entry and run heartbeat rounds until it commits
        // everywhere.
        nodes[leader_pos].append_entry(make_entry(42)).unwrap();
        for _ in 0..(HEARTBEAT_INTERVAL * 4) {
            let mut traffic = Vec::new();
            for node in nodes.iter_mut() {
                traffic.extend(node.tick());
            }
            pump(&mut nodes, traffic);
        }

        for node in &nodes {
            assert_eq!(node.log().len(), 1);
            assert_eq!(node.log()[0].tx_id, 42);
            assert!(node.commit_index() >= 1, "node {} lagging", node.node_id());
        }
    }

    #[test]
    fn test_partitioned_follower_catches_up() {
        let mut nodes: Vec<Raft> = (1..=3).map(|id| make_raft(id, id as u64 * 131)).collect();
        for i in 0..3 {
            for j in 0..3 {
                if i != j {
                    let peer = nodes[j].node_id();
                    nodes[i].add_peer(peer).unwrap();
                }
            }
        }

        // Partition node 3: nobody sends to it, and its own messages are
        // dropped by skipping its traffic.
        for id in [1u32, 2] {
            let pos = nodes.iter().position(|n| n.node_id() == id).unwrap();
            nodes[pos].set_peer_active(3, false);
        }

        // Elect among {1, 2} and commit an entry.
        for _ in 0..(ELECTION_TIMEOUT_MAX * 3) {
            let mut traffic = Vec::new();
            for node in nodes.iter_mut().filter(|n| n.node_id() != 3) {
                traffic.extend(node.tick());
            }
            traffic.retain(|m| m.to != 3);
            pump(&mut nodes, traffic);
            if nodes.iter().any(|n| n.is_leader()) {
                break;
            }
        }
        let leader_pos = nodes.iter().position(|n| n.is_leader()).unwrap();
        nodes[leader_pos].append_entry(make_entry(7)).unwrap();

        for _ in 0..(HEARTBEAT_INTERVAL * 4) {
            let mut traffic = Vec::new();
            for node in nodes.iter_mut().filter(|n| n.node_id() != 3) {
                traffic.extend(node.tick());
            }
            traffic.retain(|m| m.to != 3);
            pump(&mut nodes, traffic);
        }
        assert!(nodes[leader_pos].commit_index() >= 1);

        // Heal the partition; node 3 receives the entry within a few
        // heartbeat rounds.
        let leader_id = nodes[leader_pos].node_id();
        let pos = nodes.iter().position(|n| n.node_id() == leader_id).unwrap();
        nodes[pos].set_peer_active(3, true);

        for _ in 0..(HEARTBEAT_INTERVAL * 4) {
            let mut traffic = Vec::new();
            for node in nodes.iter_mut() {
                traffic.extend(node.tick());
            }
            pump(&mut nodes, traffic);
        }

        let node3 = nodes.iter().find(|n| n.node_id() == 3).unwrap();
        assert_eq!(node3.log().len(), 1);
        assert!(node3.commit_index() >= 1);
    }

    #[test]
    fn test_higher_term_demotes_leader() {
        let mut raft = make_raft(1, 5);
        while !raft.is_leader() {
            raft.tick();
        }

        let msg = RaftMessage {
            from: 9,
            to: 1,
            rpc: RaftRpc::AppendEntries {
                term: raft.current_term() + 5,
                prev_log_index: 0,
                prev_log_term: 0,
                leader_commit: 0,
                entries: vec![],
            },
        };
        raft.handle_message(&msg);

        assert_eq!(raft.role(), RaftRole::Follower);
        assert_eq!(raft.current_term(), msg_term(&msg));
    }

    fn msg_term(msg: &RaftMessage) -> u64 {
        match msg.rpc {
            RaftRpc::AppendEntries { term, .. } => term,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_vote_refused_for_stale_log() {
        let mut raft = make_raft(1, 5);
        while !raft.is_leader() {
            raft.tick();
        }
        raft.append_entry(make_entry(1)).unwrap();

        // Candidate with an empty log at a newer term: term is adopted but
        // the vote is withheld.
        let responses = raft.handle_message(&RaftMessage {
            from: 2,
            to: 1,
            rpc: RaftRpc::RequestVote {
                term: raft.current_term() + 1,
                last_log_index: 0,
                last_log_term: 0,
            },
        });

        assert_eq!(responses.len(), 1);
        match responses[0].rpc {
            RaftRpc::VoteResponse { vote_granted, .. } => assert!(!vote_granted),
            _ => panic!("expected a vote response"),
        }
        assert_eq!(raft.role(), RaftRole::Follower);
    }

    #[test]
    fn test_append_entry_requires_leadership() {
        let mut raft = make_raft(1, 5);
        assert_eq!(raft.append_entry(make_entry(1)), Err(RaftError::NotLeader));

        // The ungated variant records locally regardless of role.
        let index = raft.append_local(make_entry(1)).unwrap();
        assert_eq!(index, 1);
    }

    #[test]
    fn test_entry_data_cap() {
        let mut raft = make_raft(1, 5);
        let mut entry = make_entry(1);
        entry.data = vec![0u8; MAX_ENTRY_DATA + 1];

        assert!(matches!(
            raft.append_local(entry),
            Err(RaftError::EntryTooLarge { .. })
        ));
    }

    #[test]
    fn test_epoch_lifecycle() {
        let mut raft = make_raft(1, 5);

        raft.start_epoch(1).unwrap();
        assert_eq!(raft.start_epoch(2), Err(RaftError::EpochInProgress));

        // Nothing committed and unapplied: the epoch is trivially
        // complete.
        assert!(raft.is_epoch_complete());

        raft.end_epoch().unwrap();
        assert_eq!(raft.end_epoch(), Err(RaftError::EpochNotActive));
        assert!(!raft.is_epoch_complete());
    }

    #[test]
    fn test_end_epoch_applies_committed_prefix() {
        let mut raft = make_raft(1, 5);
        while !raft.is_leader() {
            raft.tick();
        }

        raft.start_epoch(1).unwrap();
        raft.append_entry(make_entry(1)).unwrap();
        // Single-node cluster: its own append is majority-replicated.
        raft.advance_commit_index();
        assert_eq!(raft.commit_index(), 1);
        assert!(!raft.is_epoch_complete());

        raft.end_epoch().unwrap();
        assert_eq!(raft.last_applied(), 1);
    }
}
