//! The per-resource cache entry and the in-memory index.

use std::collections::HashMap;

use parking_lot::RwLock;
use rill_core::{ChunkKey, Namehash, Timestamp};

/// Cached state of one mutable resource.
///
/// When synced it reflects the most recently observed update: its period,
/// version, key and payload. A resource that has never observed a valid
/// root or update chunk is unsynced and cannot serve as the basis for a new
/// update.
#[derive(Debug, Clone)]
pub struct Resource {
    /// Resource name; equals its own IDNA-ASCII form.
    pub name: String,
    /// Canonical hash of the name; keys the root chunk.
    pub name_hash: Namehash,
    /// Block height at which the resource was registered.
    pub start_block: u64,
    /// Blocks per update period.
    pub frequency: u64,
    /// Period of the last observed update, 0 if none.
    pub last_period: u32,
    /// Version of the last observed update, 0 if none.
    pub version: u32,
    /// Key of the last observed update chunk.
    pub last_key: ChunkKey,
    /// Payload of the last observed update.
    pub data: Vec<u8>,
    /// When the entry last observed a valid chunk; `None` means never.
    pub updated: Option<Timestamp>,
}

impl Resource {
    /// Creates an unsynced entry for a name and its hash.
    pub fn new(name: String, name_hash: Namehash) -> Self {
        Self {
            name,
            name_hash,
            start_block: 0,
            frequency: 0,
            last_period: 0,
            version: 0,
            last_key: ChunkKey::zero(),
            data: Vec::new(),
            updated: None,
        }
    }

    /// Returns true iff the entry has observed at least one valid chunk.
    pub fn is_synced(&self) -> bool {
        self.updated.is_some()
    }
}

/// Thread-safe mapping from resource name to cached metadata.
///
/// Readers take a shared lock and receive a clone of the entry; writers
/// take an exclusive lock and replace it. An insert happens-before all
/// subsequent reads of the same name.
pub struct ResourceIndex {
    entries: RwLock<HashMap<String, Resource>>,
}

impl ResourceIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns a snapshot of the entry for a name.
    pub fn get(&self, name: &str) -> Option<Resource> {
        self.entries.read().get(name).cloned()
    }

    /// Installs or replaces the entry for its name.
    pub fn insert(&self, resource: Resource) {
        self.entries.write().insert(resource.name.clone(), resource);
    }

    /// Returns the number of cached resources.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if no resources are cached.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for ResourceIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rill_core::raw_name_hash;

    #[test]
    fn test_fresh_resource_is_unsynced() {
        let rsrc = Resource::new("foo.bar".to_string(), raw_name_hash("foo.bar"));
        assert!(!rsrc.is_synced());
        assert_eq!(rsrc.last_period, 0);
        assert_eq!(rsrc.version, 0);
    }

    #[test]
    fn test_index_insert_replaces() {
        let index = ResourceIndex::new();
        let mut rsrc = Resource::new("foo.bar".to_string(), raw_name_hash("foo.bar"));
        index.insert(rsrc.clone());

        rsrc.last_period = 3;
        rsrc.updated = Some(Timestamp::now());
        index.insert(rsrc);

        let cached = index.get("foo.bar").unwrap();
        assert_eq!(cached.last_period, 3);
        assert!(cached.is_synced());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_index_miss() {
        let index = ResourceIndex::new();
        assert!(index.get("nope").is_none());
        assert!(index.is_empty());
    }
}
