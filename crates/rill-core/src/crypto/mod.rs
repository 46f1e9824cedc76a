//! Cryptographic primitives: Keccak-256 hashing and recoverable
//! secp256k1 signatures.

pub mod keccak;
pub mod signature;

pub use keccak::{keccak256, Keccak256Hasher};
pub use signature::{address_of, recover_signer, CryptoError, Signature, SIGNATURE_LENGTH};
