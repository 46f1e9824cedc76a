//! The resource handler: registration, updates and the lookup walk.

use std::sync::Arc;
use std::time::Duration;

use rill_core::crypto::recover_signer;
use rill_core::{
    is_safe_name, key_data_digest, raw_name_hash, update_key, ChunkKey, Digest, Namehash,
    Timestamp, HASH_SIZE,
};
use rill_proto::{max_data_len, RootEntry, UpdateChunk, MAX_CHUNK_PAYLOAD};
use rill_store::{Chunk, ResourceChunkStore};
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::oracle::BlockOracle;
use crate::resource::{Resource, ResourceIndex};
use crate::validator::ResourceValidator;
use crate::ResourceError;

/// Default bound on waiting for storage acknowledgement after an update.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(4000);

/// Handler configuration.
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    /// How long an update waits for storage acknowledgement. Expiry does
    /// not fail the update; the store may still accept the chunk later.
    pub store_timeout: Duration,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}

/// Orchestrates the mutable-resource protocol.
///
/// Holds the chunk store facade, the block oracle, the optional validator
/// and the in-memory resource index. All operations take `&self`; the
/// index is internally synchronized. Two concurrent updates to the same
/// name may observe the same cached period and derive the same key, so
/// callers must serialize their own updates per name.
pub struct ResourceHandler {
    store: ResourceChunkStore,
    oracle: Arc<dyn BlockOracle>,
    validator: Option<Arc<dyn ResourceValidator>>,
    index: ResourceIndex,
    store_timeout: Duration,
    shutdown: watch::Sender<bool>,
}

impl ResourceHandler {
    /// Creates a handler over a chunk store and block oracle.
    ///
    /// With `validator` set to `None`, signature and access validation are
    /// deactivated and chunks carry no signature.
    pub fn new(
        store: ResourceChunkStore,
        oracle: Arc<dyn BlockOracle>,
        validator: Option<Arc<dyn ResourceValidator>>,
        config: HandlerConfig,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            store,
            oracle,
            validator,
            index: ResourceIndex::new(),
            store_timeout: config.store_timeout,
            shutdown,
        }
    }

    /// Returns true iff update validation is active.
    pub fn is_validated(&self) -> bool {
        self.validator.is_some()
    }

    /// Size in bytes of the hash function, for external reporting.
    pub fn hash_size(&self) -> usize {
        match &self.validator {
            Some(validator) => validator.hash_size(),
            None => HASH_SIZE,
        }
    }

    /// Per-chunk payload capacity; an update cannot span chunks.
    pub fn chunk_size(&self) -> usize {
        MAX_CHUNK_PAYLOAD
    }

    /// Canonical hash of a resource name: the validator's namehash when one
    /// is configured, otherwise Keccak-256 of the raw name bytes.
    pub fn name_hash(&self, name: &str) -> Namehash {
        match &self.validator {
            Some(validator) => validator.name_hash(name),
            None => raw_name_hash(name),
        }
    }

    /// Returns the key and payload of the current update of a synced
    /// resource.
    pub fn get_content(&self, name: &str) -> Result<(ChunkKey, Vec<u8>), ResourceError> {
        let rsrc = self.synced_resource(name)?;
        Ok((rsrc.last_key, rsrc.data))
    }

    /// Returns the period of the last observed update of a synced resource.
    pub fn get_last_period(&self, name: &str) -> Result<u32, ResourceError> {
        Ok(self.synced_resource(name)?.last_period)
    }

    /// Returns the version of the last observed update of a synced
    /// resource.
    pub fn get_version(&self, name: &str) -> Result<u32, ResourceError> {
        Ok(self.synced_resource(name)?.version)
    }

    /// Queries the block oracle for the current height.
    ///
    /// Aborts with [`ResourceError::Closed`] if the handler is closed while
    /// the query is in flight.
    pub async fn get_block(&self) -> Result<u64, ResourceError> {
        let mut shutdown = self.shutdown.subscribe();
        if *shutdown.borrow() {
            return Err(ResourceError::Closed);
        }
        tokio::select! {
            height = self.oracle.block_number() => height.map_err(ResourceError::Oracle),
            _ = shutdown.changed() => Err(ResourceError::Closed),
        }
    }

    /// Period that an update published at `block` would fall into.
    pub fn block_to_period(&self, name: &str, block: u64) -> Result<u32, ResourceError> {
        let rsrc = self.known_resource(name)?;
        Ok(next_period(rsrc.start_block, block, rsrc.frequency))
    }

    /// First block of the given period.
    pub fn period_to_block(&self, name: &str, period: u32) -> Result<u64, ResourceError> {
        let rsrc = self.known_resource(name)?;
        Ok(rsrc.start_block + u64::from(period) * rsrc.frequency)
    }

    /// Creates a new root entry for a mutable resource.
    ///
    /// The start block is the current block height of the connected ledger.
    /// With a validator configured, the caller's key signs the namehash and
    /// the recovered signer must hold access to the name; the signature
    /// serves only as an authorization check and is not stored in the root
    /// chunk.
    pub async fn new_resource(
        &self,
        name: &str,
        frequency: u64,
    ) -> Result<Resource, ResourceError> {
        // frequency 0 is invalid
        if frequency == 0 {
            return Err(ResourceError::ZeroFrequency);
        }
        if !is_safe_name(name) {
            return Err(ResourceError::InvalidName(name.to_string()));
        }

        let name_hash = self.name_hash(name);

        if let Some(validator) = &self.validator {
            let digest = Digest::new(*name_hash.as_bytes());
            let signature = validator.sign(&digest)?;
            let signer = recover_signer(&digest, &signature)?;
            if !validator.check_access(name, &signer)? {
                return Err(ResourceError::AccessDenied {
                    name: name.to_string(),
                    address: signer,
                });
            }
        }

        let current_block = self.get_block().await?;

        // the chunk keyed by the namehash records the start block and the
        // update frequency; from it a reader knows from which block to look
        // for updates, and how often
        let entry = RootEntry::new(current_block, frequency);
        self.store
            .put(Chunk::new(name_hash.into(), entry.to_bytes().to_vec()))
            .await?;
        debug!(
            name,
            key = %name_hash,
            start_block = current_block,
            frequency,
            "New resource"
        );

        let mut rsrc = Resource::new(name.to_string(), name_hash);
        rsrc.start_block = current_block;
        rsrc.frequency = frequency;
        rsrc.updated = Some(Timestamp::now());
        self.index.insert(rsrc.clone());

        Ok(rsrc)
    }

    /// Publishes a data update for a resource.
    ///
    /// Uses the cached index entry to pick the next period and version; the
    /// entry must be synced, or a stale period could assign an already-used
    /// key. Returns the key of the stored chunk.
    pub async fn update(&self, name: &str, data: &[u8]) -> Result<ChunkKey, ResourceError> {
        let mut rsrc = self.synced_resource(name)?;

        let limit = max_data_len(name.len(), self.is_validated());
        if data.len() > limit {
            return Err(ResourceError::DataOverflow {
                size: data.len(),
                limit,
            });
        }

        let current_block = self.get_block().await?;
        let period = next_period(rsrc.start_block, current_block, rsrc.frequency);

        // successive updates within one period take incremental versions
        let version = if rsrc.last_period == period {
            rsrc.version + 1
        } else {
            1
        };

        let key = update_key(period, version, &rsrc.name_hash);

        let mut signature = None;
        if let Some(validator) = &self.validator {
            let digest = key_data_digest(&key, data);
            let sig = validator.sign(&digest)?;
            // recovering the signer also checks that the signature is valid
            let signer = recover_signer(&digest, &sig)?;
            if !validator.check_access(name, &signer)? {
                return Err(ResourceError::AccessDenied {
                    name: name.to_string(),
                    address: signer,
                });
            }
            signature = Some(sig);
        }

        let payload =
            UpdateChunk::new(period, version, name, data.to_vec(), signature).to_bytes()?;
        let receipt = self.store.put(Chunk::new(key, payload)).await?;

        // bounded wait for acknowledgement; expiry does not fail the update,
        // the store may still accept the chunk and the caller holds the key
        let _ = timeout(self.store_timeout, receipt.acknowledged()).await;
        trace!(
            name,
            key = %key,
            current_block,
            period,
            version,
            "Resource update"
        );

        rsrc.last_period = period;
        rsrc.version = version;
        rsrc.last_key = key;
        rsrc.data = data.to_vec();
        self.index.insert(rsrc);

        Ok(key)
    }

    /// Retrieves a specific version of a resource update within a period,
    /// deriving the namehash from the name.
    pub async fn lookup_version_by_name(
        &self,
        name: &str,
        period: u32,
        version: u32,
        refresh: bool,
    ) -> Result<Resource, ResourceError> {
        self.lookup_version(self.name_hash(name), name, period, version, refresh)
            .await
    }

    /// Retrieves a specific version of a resource update within a period.
    ///
    /// With `refresh` set, the resource metadata is reloaded from the root
    /// chunk; it is the caller's responsibility that the root chunk exists.
    pub async fn lookup_version(
        &self,
        name_hash: Namehash,
        name: &str,
        period: u32,
        version: u32,
        refresh: bool,
    ) -> Result<Resource, ResourceError> {
        let rsrc = self.load_resource(name_hash, name, refresh).await?;
        self.lookup(rsrc, period, version).await
    }

    /// Retrieves the latest update within a specific period, deriving the
    /// namehash from the name.
    pub async fn lookup_historical_by_name(
        &self,
        name: &str,
        period: u32,
        refresh: bool,
    ) -> Result<Resource, ResourceError> {
        self.lookup_historical(self.name_hash(name), name, period, refresh)
            .await
    }

    /// Retrieves the latest update within a specific period.
    ///
    /// Version numbers are iterated until a fetch fails; the last
    /// successfully retrieved version wins.
    pub async fn lookup_historical(
        &self,
        name_hash: Namehash,
        name: &str,
        period: u32,
        refresh: bool,
    ) -> Result<Resource, ResourceError> {
        let rsrc = self.load_resource(name_hash, name, refresh).await?;
        self.lookup(rsrc, period, 0).await
    }

    /// Retrieves the latest update of a resource, deriving the namehash
    /// from the name.
    pub async fn lookup_latest_by_name(
        &self,
        name: &str,
        refresh: bool,
    ) -> Result<Resource, ResourceError> {
        self.lookup_latest(self.name_hash(name), name, refresh).await
    }

    /// Retrieves the latest update of a resource at the current block
    /// height.
    ///
    /// Starts at the period the current height falls into and walks
    /// previous periods until an update is found; within the hit period,
    /// versions are iterated upward as in
    /// [`lookup_historical`](Self::lookup_historical).
    pub async fn lookup_latest(
        &self,
        name_hash: Namehash,
        name: &str,
        refresh: bool,
    ) -> Result<Resource, ResourceError> {
        let rsrc = self.load_resource(name_hash, name, refresh).await?;
        let current_block = self.get_block().await?;
        let period = next_period(rsrc.start_block, current_block, rsrc.frequency);
        self.lookup(rsrc, period, 0).await
    }

    /// Signals shutdown and closes the chunk store.
    ///
    /// Cancels in-flight oracle queries. Always call at teardown;
    /// operations after close are undefined.
    pub async fn close(&self) {
        self.shutdown.send_replace(true);
        self.store.close().await;
    }

    /// Base code for the public lookup methods: walks period space
    /// downward from `period`, and version space upward when no specific
    /// version is requested.
    async fn lookup(
        &self,
        rsrc: Resource,
        period: u32,
        mut version: u32,
    ) -> Result<Resource, ResourceError> {
        if period == 0 {
            return Err(ResourceError::ZeroPeriod);
        }

        let specific = version > 0;
        if !specific {
            version = 1;
        }

        // start from the last possible period and iterate previous ones
        // until a match; period 0 means no updates exist at all
        let mut period = period;
        while period > 0 {
            let key = update_key(period, version, &rsrc.name_hash);
            match self.store.get(&key).await {
                Ok(chunk) => {
                    if specific {
                        return self.update_resource_index(rsrc, chunk);
                    }
                    trace!(period, key = %key, "Update found, checking for version updates");
                    let mut best = chunk;
                    loop {
                        let next_version = version + 1;
                        let key = update_key(period, next_version, &rsrc.name_hash);
                        match self.store.get(&key).await {
                            Ok(newer) => {
                                trace!(
                                    version = next_version,
                                    period,
                                    key = %key,
                                    "Version update found, checking next"
                                );
                                best = newer;
                                version = next_version;
                            }
                            // a failed fetch ends the iteration; the
                            // previously retrieved version is the answer
                            Err(_) => return self.update_resource_index(rsrc, best),
                        }
                    }
                }
                Err(_) => {
                    trace!(period, key = %key, "Update not found, checking previous period");
                    period -= 1;
                }
            }
        }
        Err(ResourceError::NoUpdates)
    }

    /// Loads resource metadata, from the index when cached and not
    /// refreshing, otherwise from the root chunk.
    async fn load_resource(
        &self,
        name_hash: Namehash,
        name: &str,
        refresh: bool,
    ) -> Result<Resource, ResourceError> {
        let name = if name.is_empty() {
            name_hash.to_hex()
        } else {
            name.to_string()
        };

        if !refresh {
            if let Some(rsrc) = self.index.get(&name) {
                return Ok(rsrc);
            }
        }

        if !is_safe_name(&name) {
            return Err(ResourceError::InvalidName(name));
        }

        let chunk = self.store.get(&ChunkKey::from(name_hash)).await?;
        let entry = RootEntry::from_bytes(&chunk.data)?;
        if entry.frequency == 0 {
            return Err(ResourceError::ZeroFrequency);
        }

        let mut rsrc = Resource::new(name, name_hash);
        rsrc.start_block = entry.start_block;
        rsrc.frequency = entry.frequency;
        Ok(rsrc)
    }

    /// Syncs the index entry from a retrieved update chunk.
    fn update_resource_index(
        &self,
        mut rsrc: Resource,
        chunk: Chunk,
    ) -> Result<Resource, ResourceError> {
        let update = UpdateChunk::from_bytes(&chunk.data, self.is_validated())?;
        if update.name != rsrc.name {
            return Err(ResourceError::NameMismatch {
                expected: rsrc.name,
                actual: update.name,
            });
        }

        // only check the signature if a validator is present; the signer's
        // authorization was enforced at publication time
        if self.is_validated() {
            if let Some(signature) = &update.signature {
                let digest = key_data_digest(&chunk.key, &update.data);
                recover_signer(&digest, signature)?;
            }
        }

        rsrc.last_key = chunk.key;
        rsrc.last_period = update.period;
        rsrc.version = update.version;
        rsrc.data = update.data;
        rsrc.updated = Some(Timestamp::now());
        debug!(
            name = %rsrc.name,
            key = %chunk.key,
            period = rsrc.last_period,
            version = rsrc.version,
            "Resource synced"
        );
        self.index.insert(rsrc.clone());
        Ok(rsrc)
    }

    fn synced_resource(&self, name: &str) -> Result<Resource, ResourceError> {
        match self.index.get(name) {
            Some(rsrc) if rsrc.is_synced() => Ok(rsrc),
            _ => Err(ResourceError::NotSynced(name.to_string())),
        }
    }

    fn known_resource(&self, name: &str) -> Result<Resource, ResourceError> {
        self.index
            .get(name)
            .ok_or_else(|| ResourceError::NotSynced(name.to_string()))
    }
}

/// Period that `current` falls into for a resource registered at `start`
/// with the given frequency: `(current - start) / frequency + 1`.
fn next_period(start: u64, current: u64, frequency: u64) -> u32 {
    (current.saturating_sub(start) / frequency + 1) as u32
}
