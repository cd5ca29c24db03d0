//! # TS-05: Wire Layer
//!
//! The framed authenticated envelope exchanged between replicas, plus the
//! per-node roster and inbox/outbox queues. The envelope byte layout is a
//! stable wire contract: fixed-width little-endian fields in declaration
//! order, signed with the sender's node key over everything but the
//! signature itself.
//!
//! The layer is transport-agnostic: sends land in an outbox that the host
//! channel (or an in-process router) drains, and inbound frames are pushed
//! into the inbox and verified on receive.

pub mod envelope;
pub mod errors;
pub mod network;

pub use envelope::{Envelope, MessageKind, ENVELOPE_HEADER_LEN, MAX_PAYLOAD};
pub use errors::WireError;
pub use network::{PeerEntry, WireNetwork, MAX_WIRE_PEERS};
