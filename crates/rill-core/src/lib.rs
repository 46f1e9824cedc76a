//! Rill Core - Core types and primitives for the rill mutable-resource layer.
//!
//! This crate provides:
//! - Keccak-256 hashing and chunk-key derivation
//! - Recoverable secp256k1 signatures and signer addresses
//! - Identifier types (Namehash, ChunkKey, Digest, Address)
//! - Resource-name safety (IDNA-ASCII stability)
//! - Timestamps for sync tracking

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod crypto;
pub mod identifiers;
pub mod keys;
pub mod name;
pub mod time;

pub use crypto::*;
pub use identifiers::*;
pub use keys::*;
pub use name::{is_safe_name, to_safe_name, NameError};
pub use time::Timestamp;

/// Size in bytes of every hash output in the update scheme.
pub const HASH_SIZE: usize = 32;
