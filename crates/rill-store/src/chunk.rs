//! The chunk unit of storage.

use rill_core::ChunkKey;

/// A stored chunk: a 32-byte key and its payload bytes.
///
/// Unlike content-addressed chunks, the keys here are derived from resource
/// metadata (namehash, period, version) and do not validate as hashes of the
/// payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The chunk key.
    pub key: ChunkKey,
    /// The payload bytes.
    pub data: Vec<u8>,
}

impl Chunk {
    /// Creates a new chunk.
    pub fn new(key: ChunkKey, data: Vec<u8>) -> Self {
        Self { key, data }
    }

    /// Returns the payload size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}
