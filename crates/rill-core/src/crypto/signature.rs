//! Recoverable secp256k1 signatures.
//!
//! An update signature is 65 bytes: the 64-byte ECDSA signature followed by
//! a one-byte recovery id. The signer is never shipped alongside the chunk;
//! readers recover the signing address from the digest and signature alone.

use std::fmt;

use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use thiserror::Error;

use crate::crypto::keccak::keccak256;
use crate::identifiers::{Address, Digest};

/// Length in bytes of a recoverable signature (r ‖ s ‖ recovery id).
pub const SIGNATURE_LENGTH: usize = 65;

/// Errors from signing and signer recovery.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The 64-byte r‖s portion does not parse as an ECDSA signature
    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    /// The trailing recovery byte is out of range
    #[error("Invalid recovery id: {0}")]
    InvalidRecoveryId(u8),

    /// Public-key recovery failed for the digest/signature pair
    #[error("Signer recovery failed: {0}")]
    RecoveryFailed(String),

    /// Producing a signature failed
    #[error("Signing failed: {0}")]
    SigningFailed(String),
}

/// A 65-byte recoverable signature over a 32-byte digest.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; SIGNATURE_LENGTH]);

impl Signature {
    /// Creates a signature from a 65-byte array.
    pub const fn new(bytes: [u8; SIGNATURE_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Creates from a byte slice; the slice must be exactly 65 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != SIGNATURE_LENGTH {
            return None;
        }
        let mut arr = [0u8; SIGNATURE_LENGTH];
        arr.copy_from_slice(bytes);
        Some(Self(arr))
    }

    /// Returns the inner bytes.
    pub const fn as_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.0
    }

    /// Signs a digest with the given key, producing a recoverable signature.
    pub fn sign(key: &SigningKey, digest: &Digest) -> Result<Self, CryptoError> {
        let (sig, recovery_id) = key
            .sign_prehash_recoverable(digest.as_slice())
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

        let mut bytes = [0u8; SIGNATURE_LENGTH];
        bytes[..64].copy_from_slice(&sig.to_bytes());
        bytes[64] = recovery_id.to_byte();
        Ok(Self(bytes))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}…)", hex::encode(&self.0[..8]))
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Recovers the signer address from a digest and its signature.
///
/// Also serves as signature verification: a signature that does not recover
/// to any public key is rejected here.
pub fn recover_signer(digest: &Digest, signature: &Signature) -> Result<Address, CryptoError> {
    let sig = EcdsaSignature::from_slice(&signature.0[..64])
        .map_err(|e| CryptoError::MalformedSignature(e.to_string()))?;
    let recovery_id = RecoveryId::from_byte(signature.0[64])
        .ok_or(CryptoError::InvalidRecoveryId(signature.0[64]))?;

    let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &sig, recovery_id)
        .map_err(|e| CryptoError::RecoveryFailed(e.to_string()))?;
    Ok(address_of(&key))
}

/// Derives the 20-byte address of a public key.
///
/// Trailing 20 bytes of Keccak-256 over the uncompressed point without its
/// 0x04 prefix.
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&hash[12..]);
    Address(addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn test_sign_and_recover() {
        let key = SigningKey::random(&mut OsRng);
        let digest = Digest::new(keccak256(b"some update payload"));

        let signature = Signature::sign(&key, &digest).unwrap();
        let recovered = recover_signer(&digest, &signature).unwrap();

        assert_eq!(recovered, address_of(key.verifying_key()));
    }

    #[test]
    fn test_recover_wrong_digest_yields_other_address() {
        let key = SigningKey::random(&mut OsRng);
        let digest = Digest::new(keccak256(b"payload"));
        let signature = Signature::sign(&key, &digest).unwrap();

        // A different digest recovers to some key, but not the signer's.
        let other = Digest::new(keccak256(b"other payload"));
        match recover_signer(&other, &signature) {
            Ok(addr) => assert_ne!(addr, address_of(key.verifying_key())),
            Err(CryptoError::RecoveryFailed(_)) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn test_invalid_recovery_byte() {
        let key = SigningKey::random(&mut OsRng);
        let digest = Digest::new(keccak256(b"payload"));
        let mut signature = Signature::sign(&key, &digest).unwrap();
        signature.0[64] = 0x2A;

        assert!(matches!(
            recover_signer(&digest, &signature),
            Err(CryptoError::InvalidRecoveryId(0x2A))
        ));
    }

    #[test]
    fn test_signature_from_slice_length() {
        assert!(Signature::from_slice(&[0u8; 64]).is_none());
        assert!(Signature::from_slice(&[0u8; 65]).is_some());
    }
}
