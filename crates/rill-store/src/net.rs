//! Networked retrieval and the chunk store facade.
//!
//! The network store is an external collaborator reached through the
//! `NetStore` trait. A fetch may complete immediately from the remote side's
//! cache, or report an in-flight retrieval that delivers later; the facade
//! bounds the wait for the latter. A publish hands the chunk to the network
//! store and returns a receipt that resolves when the store acknowledges it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rill_core::ChunkKey;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::trace;

use crate::{Chunk, LocalChunkStore, StoreConfig, StoreError};

/// Outcome of a network fetch.
pub enum Retrieval {
    /// The chunk was available immediately.
    Found(Chunk),
    /// A retrieval is in flight; the receiver delivers the chunk when it
    /// arrives, or closes if delivery is abandoned.
    Pending(oneshot::Receiver<Chunk>),
}

/// Acknowledgement receipt for a published chunk.
///
/// Resolves once the store has accepted the chunk. A receipt whose sender is
/// dropped resolves as well; callers bound the wait and treat expiry as
/// non-fatal, since the store may still accept the chunk later.
pub struct StoreReceipt {
    rx: Option<oneshot::Receiver<()>>,
}

impl StoreReceipt {
    /// A receipt that is already acknowledged.
    pub fn ready() -> Self {
        Self { rx: None }
    }

    /// A pending receipt and the sender that acknowledges it.
    pub fn pending() -> (Self, oneshot::Sender<()>) {
        let (tx, rx) = oneshot::channel();
        (Self { rx: Some(rx) }, tx)
    }

    /// Waits until the store acknowledges the chunk.
    pub async fn acknowledged(self) {
        if let Some(rx) = self.rx {
            let _ = rx.await;
        }
    }
}

/// Networked chunk retrieval and publication.
#[async_trait]
pub trait NetStore: Send + Sync {
    /// Fetches a chunk by key.
    async fn fetch(&self, key: &ChunkKey) -> Result<Retrieval, StoreError>;

    /// Publishes a chunk, returning an acknowledgement receipt.
    async fn publish(&self, chunk: Chunk) -> Result<StoreReceipt, StoreError>;

    /// Releases network resources.
    async fn close(&self);
}

/// Chunk store facade for the resource layer.
///
/// Serves reads from the local store when possible, falling back to the
/// network store with a bounded wait for in-flight retrievals. Writes land
/// locally and are forwarded to the network store.
pub struct ResourceChunkStore {
    local: Arc<LocalChunkStore>,
    net: Arc<dyn NetStore>,
    retrieval_timeout: Duration,
}

impl ResourceChunkStore {
    /// Creates a facade over a local store and a network store.
    pub fn new(
        local: Arc<LocalChunkStore>,
        net: Arc<dyn NetStore>,
        retrieval_timeout: Duration,
    ) -> Self {
        Self {
            local,
            net,
            retrieval_timeout,
        }
    }

    /// Opens a facade whose local store lives under the configured data
    /// dir.
    pub fn open(config: &StoreConfig, net: Arc<dyn NetStore>) -> Result<Self, StoreError> {
        config.create_dirs()?;
        let local = Arc::new(LocalChunkStore::open(&config.resource_path())?);
        Ok(Self::new(local, net, config.retrieval_timeout))
    }

    /// Returns the local store.
    pub fn local(&self) -> &Arc<LocalChunkStore> {
        &self.local
    }

    /// Retrieves a chunk, consulting the local store first.
    ///
    /// An in-flight network retrieval is awaited for at most the configured
    /// timeout. An expired wait yields [`StoreError::Timeout`]; the caller
    /// cannot distinguish an absent chunk from a slow network.
    pub async fn get(&self, key: &ChunkKey) -> Result<Chunk, StoreError> {
        if let Some(chunk) = self.local.get(key)? {
            return Ok(chunk);
        }

        match self.net.fetch(key).await? {
            Retrieval::Found(chunk) => {
                self.local.put(&chunk)?;
                Ok(chunk)
            }
            Retrieval::Pending(rx) => match timeout(self.retrieval_timeout, rx).await {
                Ok(Ok(chunk)) => {
                    trace!(key = %key, "Received chunk from in-flight retrieval");
                    self.local.put(&chunk)?;
                    Ok(chunk)
                }
                Ok(Err(_)) => Err(StoreError::NotFound(*key)),
                Err(_) => Err(StoreError::Timeout),
            },
        }
    }

    /// Stores a chunk locally and forwards it to the network store.
    pub async fn put(&self, chunk: Chunk) -> Result<StoreReceipt, StoreError> {
        self.local.put(&chunk)?;
        self.net.publish(chunk).await
    }

    /// Closes the network store, then the local store.
    pub async fn close(&self) {
        self.net.close().await;
        self.local.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tempfile::TempDir;

    /// Scripted network store: each fetch pops the next outcome.
    #[derive(Default)]
    struct ScriptedNet {
        outcomes: Mutex<Vec<ScriptedOutcome>>,
    }

    enum ScriptedOutcome {
        Miss,
        Found(Chunk),
        PendingDeliver(Chunk, Duration),
        PendingDrop,
    }

    #[async_trait]
    impl NetStore for ScriptedNet {
        async fn fetch(&self, key: &ChunkKey) -> Result<Retrieval, StoreError> {
            match self.outcomes.lock().pop() {
                None | Some(ScriptedOutcome::Miss) => Err(StoreError::NotFound(*key)),
                Some(ScriptedOutcome::Found(chunk)) => Ok(Retrieval::Found(chunk)),
                Some(ScriptedOutcome::PendingDeliver(chunk, delay)) => {
                    let (tx, rx) = oneshot::channel();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let _ = tx.send(chunk);
                    });
                    Ok(Retrieval::Pending(rx))
                }
                Some(ScriptedOutcome::PendingDrop) => {
                    let (_tx, rx) = oneshot::channel();
                    Ok(Retrieval::Pending(rx))
                }
            }
        }

        async fn publish(&self, _chunk: Chunk) -> Result<StoreReceipt, StoreError> {
            Ok(StoreReceipt::ready())
        }

        async fn close(&self) {}
    }

    fn facade(net: ScriptedNet, timeout: Duration) -> (ResourceChunkStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let local = Arc::new(LocalChunkStore::open(dir.path()).unwrap());
        (
            ResourceChunkStore::new(local, Arc::new(net), timeout),
            dir,
        )
    }

    #[tokio::test]
    async fn test_get_prefers_local() {
        let (store, _dir) = facade(ScriptedNet::default(), Duration::from_secs(1));
        let chunk = Chunk::new(ChunkKey::new([1; 32]), b"local".to_vec());
        store.local().put(&chunk).unwrap();

        assert_eq!(store.get(&chunk.key).await.unwrap(), chunk);
    }

    #[tokio::test]
    async fn test_get_caches_network_result() {
        let chunk = Chunk::new(ChunkKey::new([2; 32]), b"remote".to_vec());
        let net = ScriptedNet::default();
        net.outcomes
            .lock()
            .push(ScriptedOutcome::Found(chunk.clone()));

        let (store, _dir) = facade(net, Duration::from_secs(1));
        assert_eq!(store.get(&chunk.key).await.unwrap(), chunk);
        // second read must not reach the (now empty) network script
        assert_eq!(store.get(&chunk.key).await.unwrap(), chunk);
    }

    #[tokio::test]
    async fn test_get_waits_for_in_flight_delivery() {
        let chunk = Chunk::new(ChunkKey::new([3; 32]), b"late".to_vec());
        let net = ScriptedNet::default();
        net.outcomes.lock().push(ScriptedOutcome::PendingDeliver(
            chunk.clone(),
            Duration::from_millis(20),
        ));

        let (store, _dir) = facade(net, Duration::from_secs(1));
        assert_eq!(store.get(&chunk.key).await.unwrap(), chunk);
    }

    #[tokio::test]
    async fn test_get_times_out_on_slow_retrieval() {
        let chunk = Chunk::new(ChunkKey::new([4; 32]), b"too late".to_vec());
        let net = ScriptedNet::default();
        net.outcomes.lock().push(ScriptedOutcome::PendingDeliver(
            chunk,
            Duration::from_secs(5),
        ));

        let (store, _dir) = facade(net, Duration::from_millis(10));
        assert!(matches!(
            store.get(&ChunkKey::new([4; 32])).await,
            Err(StoreError::Timeout)
        ));
    }

    #[tokio::test]
    async fn test_get_abandoned_retrieval_is_not_found() {
        let net = ScriptedNet::default();
        net.outcomes.lock().push(ScriptedOutcome::PendingDrop);

        let (store, _dir) = facade(net, Duration::from_secs(1));
        assert!(matches!(
            store.get(&ChunkKey::new([5; 32])).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_open_with_config() {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig::new(dir.path().to_path_buf());
        let store = ResourceChunkStore::open(&config, Arc::new(ScriptedNet::default())).unwrap();

        let chunk = Chunk::new(ChunkKey::new([7; 32]), b"configured".to_vec());
        store.put(chunk.clone()).await.unwrap().acknowledged().await;
        assert_eq!(store.get(&chunk.key).await.unwrap(), chunk);
        assert!(dir.path().join("resource").is_dir());
    }

    #[tokio::test]
    async fn test_put_lands_locally() {
        let (store, _dir) = facade(ScriptedNet::default(), Duration::from_secs(1));
        let chunk = Chunk::new(ChunkKey::new([6; 32]), b"published".to_vec());

        let receipt = store.put(chunk.clone()).await.unwrap();
        receipt.acknowledged().await;
        assert!(store.local().contains(&chunk.key).unwrap());
    }
}
