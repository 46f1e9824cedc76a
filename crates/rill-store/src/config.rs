//! Storage configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Default bound on waiting for an in-flight network retrieval.
pub const DEFAULT_RETRIEVAL_TIMEOUT: Duration = Duration::from_secs(1);

/// Subdirectory of the data dir holding the resource chunk database.
pub const DB_DIR_NAME: &str = "resource";

/// Storage configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base path for all storage
    pub base_path: PathBuf,
    /// How long to wait for an in-flight network retrieval
    pub retrieval_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from(".rill"),
            retrieval_timeout: DEFAULT_RETRIEVAL_TIMEOUT,
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with the given base path.
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            ..Default::default()
        }
    }

    /// Returns the path for the resource chunk database.
    pub fn resource_path(&self) -> PathBuf {
        self.base_path.join(DB_DIR_NAME)
    }

    /// Creates all necessary directories.
    pub fn create_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.resource_path())
    }
}
