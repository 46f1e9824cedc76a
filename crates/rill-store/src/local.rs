//! Local chunk storage backed by RocksDB.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use rill_core::ChunkKey;
use rocksdb::{Options, DB};
use tracing::debug;

use crate::{Chunk, StoreError};

/// Column family name for chunks.
const CHUNKS_CF: &str = "chunks";

/// Local persistent chunk store.
pub struct LocalChunkStore {
    db: Arc<DB>,
    /// Statistics tracking
    stats: RwLock<LocalStoreStats>,
}

/// Statistics for the local chunk store.
#[derive(Debug, Default, Clone)]
pub struct LocalStoreStats {
    /// Total chunks stored
    pub chunks_stored: u64,
    /// Total bytes stored
    pub bytes_stored: u64,
    /// Lookup hits
    pub hits: u64,
    /// Lookup misses
    pub misses: u64,
}

impl LocalChunkStore {
    /// Opens or creates a chunk store at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        // Optimize for random reads
        opts.set_allow_concurrent_memtable_write(true);
        opts.set_enable_write_thread_adaptive_yield(true);

        let db = DB::open_cf(&opts, path, [CHUNKS_CF])
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            stats: RwLock::new(LocalStoreStats::default()),
        })
    }

    /// Stores a chunk under its key, replacing any previous payload.
    pub fn put(&self, chunk: &Chunk) -> Result<(), StoreError> {
        let cf = self
            .db
            .cf_handle(CHUNKS_CF)
            .ok_or_else(|| StoreError::Database("Missing chunks column family".to_string()))?;

        self.db
            .put_cf(&cf, chunk.key.as_slice(), &chunk.data)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        {
            let mut stats = self.stats.write();
            stats.chunks_stored += 1;
            stats.bytes_stored += chunk.data.len() as u64;
        }

        debug!(key = %chunk.key, size = chunk.size(), "Stored chunk");
        Ok(())
    }

    /// Retrieves a chunk by key.
    pub fn get(&self, key: &ChunkKey) -> Result<Option<Chunk>, StoreError> {
        let cf = self
            .db
            .cf_handle(CHUNKS_CF)
            .ok_or_else(|| StoreError::Database("Missing chunks column family".to_string()))?;

        match self
            .db
            .get_cf(&cf, key.as_slice())
            .map_err(|e| StoreError::Database(e.to_string()))?
        {
            Some(bytes) => {
                self.stats.write().hits += 1;
                Ok(Some(Chunk::new(*key, bytes)))
            }
            None => {
                self.stats.write().misses += 1;
                Ok(None)
            }
        }
    }

    /// Checks if a chunk exists.
    pub fn contains(&self, key: &ChunkKey) -> Result<bool, StoreError> {
        let cf = self
            .db
            .cf_handle(CHUNKS_CF)
            .ok_or_else(|| StoreError::Database("Missing chunks column family".to_string()))?;

        self.db
            .get_cf(&cf, key.as_slice())
            .map(|v| v.is_some())
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Returns store statistics.
    pub fn stats(&self) -> LocalStoreStats {
        self.stats.read().clone()
    }

    /// Flushes pending writes; call at shutdown.
    pub fn close(&self) {
        if let Err(e) = self.db.flush() {
            debug!(error = %e, "Flush on close failed");
        }
    }
}
