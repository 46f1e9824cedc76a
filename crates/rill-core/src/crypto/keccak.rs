//! Keccak-256 hash.
//!
//! Keccak-256 (the original padding, not NIST SHA3-256) addresses every
//! chunk in the update scheme:
//! - Default namehash of a resource name
//! - Update-chunk keys
//! - Signing digests over key ‖ data

use sha3::{Digest as _, Keccak256};

/// Computes Keccak-256 with 256-bit output.
///
/// A fresh hasher is created per invocation; the state is small and
/// short-lived, so callers never serialize on shared hash state.
///
/// # Example
/// ```
/// use rill_core::crypto::keccak256;
///
/// // Keccak-256("") conformance anchor
/// let hash = keccak256(&[]);
/// let expected = hex::decode("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470").unwrap();
/// assert_eq!(hash.as_slice(), expected.as_slice());
/// ```
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Computes Keccak-256 incrementally over multiple inputs.
pub struct Keccak256Hasher {
    inner: Keccak256,
}

impl Keccak256Hasher {
    /// Creates a new Keccak-256 hasher.
    pub fn new() -> Self {
        Self {
            inner: Keccak256::new(),
        }
    }

    /// Updates the hasher with additional data.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finalizes the hash and returns the 32-byte output.
    pub fn finalize(self) -> [u8; 32] {
        self.inner.finalize().into()
    }
}

impl Default for Keccak256Hasher {
    fn default() -> Self {
        Self::new()
    }
}
