//! # Shared Crypto
//!
//! The primitive suite assumed by the settlement core: SHA-256 digests for
//! every commitment, Ed25519 node keys for envelope and epoch-output
//! signatures, an injectable entropy source, and an attestation-quote stub.

pub mod attestation;
pub mod entropy;
pub mod errors;
pub mod hashing;
pub mod signatures;

pub use attestation::{attestation_quote, MAX_QUOTE_LEN};
pub use entropy::{EntropySource, FailingEntropy, OsEntropy, SeededEntropy};
pub use errors::CryptoError;
pub use hashing::{sha256, sha256_concat, Sha256Hasher};
pub use signatures::{NodeKeypair, NodePublicKey, NodeSignature};
