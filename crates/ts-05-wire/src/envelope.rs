//! # Authenticated Envelope
//!
//! Frame layout, all integers little-endian:
//!
//! ```text
//! from_node_id   u32
//! to_node_id     u32
//! type           u32
//! payload_size   u32
//! timestamp      u64
//! signature      [u8; 64]
//! payload        [u8; payload_size]   (payload_size ≤ 4096)
//! ```
//!
//! The signature covers the header without the signature field,
//! concatenated with the payload.

use crate::errors::WireError;
use shared_types::NodeId;

/// Maximum payload bytes per envelope.
pub const MAX_PAYLOAD: usize = 4096;

/// Fixed header size: two node ids, type, payload size, timestamp and
/// signature.
pub const ENVELOPE_HEADER_LEN: usize = 4 + 4 + 4 + 4 + 8 + 64;

/// Message types carried between replicas. The numeric values are wire
/// contract; do not reorder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Heartbeat = 0,
    LeaderElection = 1,
    SortedTxs = 2,
    DagNode = 3,
    RequestDagNode = 4,
    DagNodeResponse = 5,
    SyncRequest = 6,
    SyncResponse = 7,
    RaftRequestVote = 8,
    RaftRequestVoteResponse = 9,
    RaftAppendEntries = 10,
    RaftAppendEntriesResponse = 11,
    TxSetBroadcast = 12,
    TxSetSignature = 13,
    EpochOutput = 14,
    EpochSyncToL2 = 15,
}

impl MessageKind {
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            0 => MessageKind::Heartbeat,
            1 => MessageKind::LeaderElection,
            2 => MessageKind::SortedTxs,
            3 => MessageKind::DagNode,
            4 => MessageKind::RequestDagNode,
            5 => MessageKind::DagNodeResponse,
            6 => MessageKind::SyncRequest,
            7 => MessageKind::SyncResponse,
            8 => MessageKind::RaftRequestVote,
            9 => MessageKind::RaftRequestVoteResponse,
            10 => MessageKind::RaftAppendEntries,
            11 => MessageKind::RaftAppendEntriesResponse,
            12 => MessageKind::TxSetBroadcast,
            13 => MessageKind::TxSetSignature,
            14 => MessageKind::EpochOutput,
            15 => MessageKind::EpochSyncToL2,
            _ => return None,
        })
    }

    /// True for the four kinds that tunnel Raft RPCs.
    pub fn is_raft(self) -> bool {
        matches!(
            self,
            MessageKind::RaftRequestVote
                | MessageKind::RaftRequestVoteResponse
                | MessageKind::RaftAppendEntries
                | MessageKind::RaftAppendEntriesResponse
        )
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(buf)
}

fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(buf)
}

/// One framed message between two replicas.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub from: NodeId,
    pub to: NodeId,
    pub kind: MessageKind,
    pub timestamp: u64,
    pub signature: [u8; 64],
    pub payload: Vec<u8>,
}

impl Envelope {
    /// Unsigned envelope; the network layer fills in the signature.
    pub fn new(
        from: NodeId,
        to: NodeId,
        kind: MessageKind,
        timestamp: u64,
        payload: Vec<u8>,
    ) -> Result<Self, WireError> {
        if payload.len() > MAX_PAYLOAD {
            return Err(WireError::PayloadTooLarge {
                actual: payload.len(),
                limit: MAX_PAYLOAD,
            });
        }
        Ok(Self {
            from,
            to,
            kind,
            timestamp,
            signature: [0u8; 64],
            payload,
        })
    }

    /// Bytes covered by the signature.
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(ENVELOPE_HEADER_LEN - 64 + self.payload.len());
        bytes.extend_from_slice(&self.from.to_le_bytes());
        bytes.extend_from_slice(&self.to.to_le_bytes());
        bytes.extend_from_slice(&self.kind.as_u32().to_le_bytes());
        bytes.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&self.timestamp.to_le_bytes());
        bytes.extend_from_slice(&self.payload);
        bytes
    }

    /// Serialize to the canonical frame.
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(ENVELOPE_HEADER_LEN + self.payload.len());
        bytes.extend_from_slice(&self.from.to_le_bytes());
        bytes.extend_from_slice(&self.to.to_le_bytes());
        bytes.extend_from_slice(&self.kind.as_u32().to_le_bytes());
        bytes.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&self.timestamp.to_le_bytes());
        bytes.extend_from_slice(&self.signature);
        bytes.extend_from_slice(&self.payload);
        bytes
    }

    /// Parse one canonical frame.
    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        if bytes.len() < ENVELOPE_HEADER_LEN {
            return Err(WireError::Malformed("frame shorter than header"));
        }

        let from = read_u32(bytes, 0);
        let to = read_u32(bytes, 4);
        let kind_raw = read_u32(bytes, 8);
        let payload_size = read_u32(bytes, 12) as usize;
        let timestamp = read_u64(bytes, 16);
        let mut signature = [0u8; 64];
        signature.copy_from_slice(&bytes[24..88]);

        let kind = MessageKind::from_u32(kind_raw).ok_or(WireError::Malformed("unknown type"))?;
        if payload_size > MAX_PAYLOAD {
            return Err(WireError::Malformed("payload size over limit"));
        }
        if bytes.len() != ENVELOPE_HEADER_LEN + payload_size {
            return Err(WireError::Malformed("frame length mismatch"));
        }

        Ok(Self {
            from,
            to,
            kind,
            timestamp,
            signature,
            payload: bytes[ENVELOPE_HEADER_LEN..].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_round_trip() {
        let mut envelope =
            Envelope::new(1, 2, MessageKind::EpochOutput, 99, vec![0xAB; 17]).unwrap();
        envelope.signature = [7u8; 64];

        let frame = envelope.encode();
        assert_eq!(frame.len(), ENVELOPE_HEADER_LEN + 17);

        let decoded = Envelope::decode(&frame).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_header_layout() {
        let envelope =
            Envelope::new(0x0102, 0x0304, MessageKind::SortedTxs, 0x05, vec![1, 2, 3]).unwrap();
        let frame = envelope.encode();

        assert_eq!(&frame[0..4], &[0x02, 0x01, 0, 0]);
        assert_eq!(&frame[4..8], &[0x04, 0x03, 0, 0]);
        assert_eq!(&frame[8..12], &[2, 0, 0, 0]);
        assert_eq!(&frame[12..16], &[3, 0, 0, 0]);
        assert_eq!(&frame[16..24], &[5, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_payload_cap() {
        assert!(matches!(
            Envelope::new(1, 2, MessageKind::Heartbeat, 0, vec![0; MAX_PAYLOAD + 1]),
            Err(WireError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_bad_frames() {
        assert!(Envelope::decode(&[0u8; 10]).is_err());

        // Unknown message type.
        let mut envelope = Envelope::new(1, 2, MessageKind::Heartbeat, 0, vec![]).unwrap();
        let mut frame = envelope.encode();
        frame[8] = 0xFF;
        assert!(matches!(
            Envelope::decode(&frame),
            Err(WireError::Malformed("unknown type"))
        ));

        // Truncated payload.
        envelope.payload = vec![1, 2, 3, 4];
        let mut frame = envelope.encode();
        frame.truncate(frame.len() - 1);
        assert!(matches!(
            Envelope::decode(&frame),
            Err(WireError::Malformed("frame length mismatch"))
        ));
    }

    #[test]
    fn test_signing_bytes_exclude_signature() {
        let mut envelope = Envelope::new(1, 2, MessageKind::DagNode, 5, vec![9]).unwrap();
        let before = envelope.signing_bytes();
        envelope.signature = [0xEE; 64];
        assert_eq!(envelope.signing_bytes(), before);
    }

    #[test]
    fn test_message_kind_round_trip() {
        for value in 0..16u32 {
            let kind = MessageKind::from_u32(value).unwrap();
            assert_eq!(kind.as_u32(), value);
        }
        assert!(MessageKind::from_u32(16).is_none());
    }
}
