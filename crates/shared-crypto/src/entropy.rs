//! # Entropy Source
//!
//! Unpredictable bytes for election timeouts and the leader's sort
//! tie-breaks. The trait keeps the source injectable: production nodes use
//! the OS generator, tests a seeded one. Callers must handle failure — the
//! leader's sort falls back to tx-id ordering when entropy is unavailable.

use crate::CryptoError;
use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};

/// Source of unpredictable bytes.
pub trait EntropySource: Send {
    /// Fill `buf` with random bytes.
    fn fill(&mut self, buf: &mut [u8]) -> Result<(), CryptoError>;

    /// Convenience: one random `u64`.
    fn next_u64(&mut self) -> Result<u64, CryptoError> {
        let mut buf = [0u8; 8];
        self.fill(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }
}

/// OS-backed entropy for production nodes.
#[derive(Default)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill(&mut self, buf: &mut [u8]) -> Result<(), CryptoError> {
        OsRng
            .try_fill_bytes(buf)
            .map_err(|_| CryptoError::EntropyUnavailable)
    }
}

/// Seeded entropy for deterministic tests.
pub struct SeededEntropy {
    rng: StdRng,
}

impl SeededEntropy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl EntropySource for SeededEntropy {
    fn fill(&mut self, buf: &mut [u8]) -> Result<(), CryptoError> {
        self.rng.fill_bytes(buf);
        Ok(())
    }
}

/// Entropy that always fails, for exercising fallback paths.
#[derive(Default)]
pub struct FailingEntropy;

impl EntropySource for FailingEntropy {
    fn fill(&mut self, _buf: &mut [u8]) -> Result<(), CryptoError> {
        Err(CryptoError::EntropyUnavailable)
    }
}
