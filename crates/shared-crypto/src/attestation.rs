//! # Attestation Quote
//!
//! Enclave quote generation is platform-specific and opaque to the core.
//! This stub produces a self-describing quote binding the node's public
//! key, sized within the roster's quote field.

use crate::hashing::sha256;
use crate::signatures::NodePublicKey;

/// Upper bound on quote size accepted by the roster.
pub const MAX_QUOTE_LEN: usize = 2048;

/// Produce an opaque quote for `public_key`. Real deployments replace this
/// with the platform's attestation report.
pub fn attestation_quote(public_key: &NodePublicKey) -> Vec<u8> {
    let mut quote = Vec::with_capacity(8 + 32 + 32);
    quote.extend_from_slice(b"TEEQUOTE");
    quote.extend_from_slice(public_key.as_bytes());
    quote.extend_from_slice(&sha256(public_key.as_bytes()));
    quote
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signatures::NodeKeypair;

    #[test]
    fn test_quote_fits_roster_field() {
        let keypair = NodeKeypair::generate();
        let quote = attestation_quote(&keypair.public_key());

        assert!(quote.len() <= MAX_QUOTE_LEN);
        assert_eq!(&quote[..8], b"TEEQUOTE");
    }

    #[test]
    fn test_quote_binds_public_key() {
        let a = attestation_quote(&NodeKeypair::generate().public_key());
        let b = attestation_quote(&NodeKeypair::generate().public_key());
        assert_ne!(a, b);
    }
}
