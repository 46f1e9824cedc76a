//! Rill Store - Chunk storage.
//!
//! Provides:
//! - A local persistent chunk store (RocksDB)
//! - The `NetStore` trait for networked retrieval and publication
//! - The retrieval facade combining both, with a bounded wait for
//!   in-flight network requests

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod chunk;
pub mod config;
pub mod local;
pub mod net;

pub use chunk::Chunk;
pub use config::StoreConfig;
pub use local::{LocalChunkStore, LocalStoreStats};
pub use net::{NetStore, ResourceChunkStore, Retrieval, StoreReceipt};

use rill_core::ChunkKey;
use thiserror::Error;

/// Errors from storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// RocksDB error
    #[error("Database error: {0}")]
    Database(String),

    /// Chunk not present in any reachable store
    #[error("Chunk not found: {0}")]
    NotFound(ChunkKey),

    /// Network retrieval exceeded its deadline; the chunk may be absent or
    /// the network slow, and the two cannot be told apart
    #[error("Chunk retrieval timed out")]
    Timeout,

    /// Store has been closed
    #[error("Store closed")]
    Closed,
}
