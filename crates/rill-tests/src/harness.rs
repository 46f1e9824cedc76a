//! Test harness for handler-level integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use k256::ecdsa::SigningKey;
use parking_lot::Mutex;
use rand::rngs::OsRng;
use rill_core::crypto::{address_of, CryptoError, Signature};
use rill_core::{raw_name_hash, Address, ChunkKey, Digest, Namehash, HASH_SIZE};
use rill_resource::{
    BlockOracle, HandlerConfig, OracleError, ResourceError, ResourceHandler, ResourceValidator,
};
use rill_store::{
    Chunk, LocalChunkStore, NetStore, ResourceChunkStore, Retrieval, StoreError, StoreReceipt,
};
use tempfile::TempDir;
use tracing::info;

/// Block oracle with a settable height.
pub struct TestOracle {
    height: AtomicU64,
}

impl TestOracle {
    /// Creates an oracle reporting the given height.
    pub fn new(height: u64) -> Self {
        Self {
            height: AtomicU64::new(height),
        }
    }

    /// Advances the reported height.
    pub fn set_height(&self, height: u64) {
        self.height.store(height, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlockOracle for TestOracle {
    async fn block_number(&self) -> Result<u64, OracleError> {
        Ok(self.height.load(Ordering::SeqCst))
    }
}

/// Validator holding a random secp256k1 key.
///
/// The namehash is plain Keccak-256 of the name bytes; access is granted or
/// denied wholesale depending on how the validator was built.
pub struct TestValidator {
    key: SigningKey,
    grant_access: bool,
}

impl TestValidator {
    /// A validator that grants its own signer access to every name.
    pub fn allowing() -> Self {
        Self {
            key: SigningKey::random(&mut OsRng),
            grant_access: true,
        }
    }

    /// A validator that denies access to every name.
    pub fn denying() -> Self {
        Self {
            key: SigningKey::random(&mut OsRng),
            grant_access: false,
        }
    }

    /// Address of the validator's signing key.
    pub fn address(&self) -> Address {
        address_of(self.key.verifying_key())
    }
}

impl ResourceValidator for TestValidator {
    fn hash_size(&self) -> usize {
        HASH_SIZE
    }

    fn name_hash(&self, name: &str) -> Namehash {
        raw_name_hash(name)
    }

    fn sign(&self, digest: &Digest) -> Result<Signature, CryptoError> {
        Signature::sign(&self.key, digest)
    }

    fn check_access(&self, _name: &str, signer: &Address) -> Result<bool, ResourceError> {
        Ok(self.grant_access && *signer == self.address())
    }
}

/// In-memory network store.
///
/// Serves fetches from a map and records publishes into it. An optional
/// acknowledgement delay postpones the publish receipt, for exercising the
/// handler's bounded acknowledgement wait.
#[derive(Default)]
pub struct MemoryNetStore {
    chunks: Mutex<HashMap<ChunkKey, Vec<u8>>>,
    ack_delay: Mutex<Option<Duration>>,
}

impl MemoryNetStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every publish acknowledgement by `delay`.
    pub fn set_ack_delay(&self, delay: Duration) {
        *self.ack_delay.lock() = Some(delay);
    }

    /// Number of chunks the network store holds.
    pub fn len(&self) -> usize {
        self.chunks.lock().len()
    }

    /// Returns true if the network store holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.lock().is_empty()
    }

    /// Returns true if a chunk has been published under the key.
    pub fn contains(&self, key: &ChunkKey) -> bool {
        self.chunks.lock().contains_key(key)
    }
}

#[async_trait]
impl NetStore for MemoryNetStore {
    async fn fetch(&self, key: &ChunkKey) -> Result<Retrieval, StoreError> {
        match self.chunks.lock().get(key) {
            Some(data) => Ok(Retrieval::Found(Chunk::new(*key, data.clone()))),
            None => Err(StoreError::NotFound(*key)),
        }
    }

    async fn publish(&self, chunk: Chunk) -> Result<StoreReceipt, StoreError> {
        self.chunks.lock().insert(chunk.key, chunk.data);
        match *self.ack_delay.lock() {
            Some(delay) => {
                let (receipt, ack) = StoreReceipt::pending();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = ack.send(());
                });
                Ok(receipt)
            }
            None => Ok(StoreReceipt::ready()),
        }
    }

    async fn close(&self) {}
}

/// A handler with its collaborators, over a temporary on-disk store.
pub struct TestSetup {
    /// The handler under test.
    pub handler: ResourceHandler,
    /// The settable block oracle.
    pub oracle: Arc<TestOracle>,
    /// The in-memory network store.
    pub net: Arc<MemoryNetStore>,
    /// The local chunk store backing the handler.
    pub local: Arc<LocalChunkStore>,
    _temp_dir: TempDir,
}

impl TestSetup {
    /// Creates a handler at block height `height`, optionally validated.
    pub fn new(
        height: u64,
        validator: Option<Arc<dyn ResourceValidator>>,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Self::with_config(height, validator, HandlerConfig::default())
    }

    /// Creates a handler with an explicit configuration.
    pub fn with_config(
        height: u64,
        validator: Option<Arc<dyn ResourceValidator>>,
        config: HandlerConfig,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let temp_dir = TempDir::new()?;
        let local = Arc::new(LocalChunkStore::open(temp_dir.path())?);
        let net = Arc::new(MemoryNetStore::new());
        let oracle = Arc::new(TestOracle::new(height));

        let store = ResourceChunkStore::new(
            local.clone(),
            net.clone(),
            Duration::from_secs(1),
        );
        let handler = ResourceHandler::new(store, oracle.clone(), validator, config);

        info!(height, "Created test handler");
        Ok(Self {
            handler,
            oracle,
            net,
            local,
            _temp_dir: temp_dir,
        })
    }

    /// Writes a raw chunk straight into the local store, bypassing the
    /// handler.
    pub fn seed_chunk(&self, key: ChunkKey, data: Vec<u8>) {
        self.local
            .put(&Chunk::new(key, data))
            .expect("seed chunk into local store");
    }
}
