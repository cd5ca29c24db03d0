//! Cluster roster entries.

use shared_crypto::MAX_QUOTE_LEN;
use shared_types::NodeId;

/// One replica as seen in the roster.
#[derive(Clone, Debug)]
pub struct TeeNodeInfo {
    pub node_id: NodeId,
    /// Ed25519 verification key bytes.
    pub public_key: [u8; 32],
    /// Opaque enclave quote, at most [`MAX_QUOTE_LEN`] bytes.
    pub enclave_quote: Vec<u8>,
    pub is_active: bool,
    pub is_leader: bool,
    /// Logical time of the last heartbeat from this node.
    pub last_heartbeat: u64,
}

impl TeeNodeInfo {
    pub fn new(node_id: NodeId, public_key: [u8; 32], enclave_quote: Vec<u8>) -> Self {
        let mut quote = enclave_quote;
        quote.truncate(MAX_QUOTE_LEN);
        Self {
            node_id,
            public_key,
            enclave_quote: quote,
            is_active: true,
            is_leader: false,
            last_heartbeat: 0,
        }
    }
}
