//! Rill Resource - Mutable resources over a content-addressed chunk store.
//!
//! A mutable resource is an entity that can be updated over time without
//! rewriting a directory or naming-system record on each change. The update
//! scheme rests on chunks whose keys follow a predictable, versionable
//! pattern:
//!
//! ```text
//! root key   = namehash(name)                       (16-byte root entry)
//! update key = Keccak-256(period ‖ version ‖ namehash)
//! ```
//!
//! Updates are periodic, with periods expressed in blocks of an external
//! ledger. A resource registered at block 4200 with frequency 42 has its
//! periods open at blocks 4242, 4284, 4326 and so on; multiple updates
//! within one period take successive version numbers. A lookup agent needs
//! only the name to walk period and version space and find the latest (or
//! any specific) update.
//!
//! This crate provides:
//! - The [`ResourceHandler`] orchestrating registration, updates and lookups
//! - The in-memory [`ResourceIndex`] of per-name metadata
//! - The optional [`ResourceValidator`] hook for signing and access control
//! - The [`BlockOracle`] trait supplying the block-height clock

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod handler;
pub mod oracle;
pub mod resource;
pub mod validator;

pub use handler::{HandlerConfig, ResourceHandler, DEFAULT_STORE_TIMEOUT};
pub use oracle::{BlockOracle, OracleError};
pub use resource::{Resource, ResourceIndex};
pub use validator::ResourceValidator;

use rill_core::crypto::CryptoError;
use rill_core::Address;
use rill_proto::CodecError;
use rill_store::StoreError;
use thiserror::Error;

/// Errors surfaced by resource operations.
///
/// Errors propagate to the caller verbatim; no retry happens at this layer.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// Update frequency of zero at registration
    #[error("Frequency cannot be 0")]
    ZeroFrequency,

    /// Name is empty or differs from its IDNA-ASCII form
    #[error("Invalid name: '{0}'")]
    InvalidName(String),

    /// Lookup period of zero
    #[error("Period must be > 0")]
    ZeroPeriod,

    /// Update data exceeds the per-chunk limit
    #[error("Data overflow: {size} / {limit} bytes")]
    DataOverflow {
        /// Offered data size
        size: usize,
        /// Per-chunk data limit for this resource
        limit: usize,
    },

    /// A retrieved update chunk names a different resource
    #[error("Update belongs to '{actual}', but have '{expected}'")]
    NameMismatch {
        /// Name of the resource being looked up
        expected: String,
        /// Name carried by the chunk
        actual: String,
    },

    /// The lookup walk exhausted all periods without finding an update
    #[error("No updates found")]
    NoUpdates,

    /// Operation requires a synced resource in the index
    #[error("Resource '{0}' does not exist or is not synced")]
    NotSynced(String),

    /// Chunk payload does not parse
    #[error("Malformed chunk: {0}")]
    Malformed(#[from] CodecError),

    /// The signer is not authorized for the resource
    #[error("Address {address} does not have access to update '{name}'")]
    AccessDenied {
        /// Resource name
        name: String,
        /// Recovered signer address
        address: Address,
    },

    /// Signing or signer recovery failed
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Chunk store failure, including retrieval timeouts
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Block oracle failure
    #[error("Block oracle error: {0}")]
    Oracle(OracleError),

    /// The handler has been closed
    #[error("Handler closed")]
    Closed,
}
