//! The optional validation hook.

use rill_core::crypto::{CryptoError, Signature};
use rill_core::{Address, Digest, Namehash};

use crate::ResourceError;

/// Signing and access control for resource updates.
///
/// When a validator is configured, every published chunk carries a
/// recoverable signature and the recovered signer must pass
/// [`check_access`](Self::check_access) at publication time. Lookups verify
/// only that the signature recovers; authorization is enforced when a chunk
/// is published, not when it is read.
///
/// The validator also supplies the canonical namehash, which is typically a
/// domain namehash rather than a plain hash of the name bytes.
pub trait ResourceValidator: Send + Sync {
    /// Size in bytes of the validator's hash function, for external
    /// reporting.
    fn hash_size(&self) -> usize;

    /// Canonical hash of a resource name.
    fn name_hash(&self, name: &str) -> Namehash;

    /// Produces a recoverable signature over a 32-byte digest.
    fn sign(&self, digest: &Digest) -> Result<Signature, CryptoError>;

    /// Returns true iff the address is authorized to update the named
    /// resource.
    fn check_access(&self, name: &str, signer: &Address) -> Result<bool, ResourceError>;
}
