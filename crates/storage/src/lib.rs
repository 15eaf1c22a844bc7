//! Durable checkpoint storage for the Verdict agent.
//!
//! Checkpoints hold in-progress work (pending attestations) that must
//! survive process restarts. They are always read and written as a whole;
//! there are no partial updates. The file-backed store replaces the
//! checkpoint atomically via a temp-file rename.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

pub mod memory;

pub use memory::MemoryCheckpointStore;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Keyed, whole-value checkpoint storage.
#[async_trait]
pub trait CheckpointStore: Send + Sync + 'static {
    /// Store raw data at the specified key, replacing any previous value.
    async fn put(&self, key: &str, data: &[u8]) -> StorageResult<()>;

    /// Retrieve the data stored at the specified key.
    async fn get(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Check whether a key exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Delete the data at the specified key.
    async fn delete(&self, key: &str) -> StorageResult<()>;
}

/// JSON convenience layer over [`CheckpointStore`].
#[async_trait]
pub trait JsonCheckpointStore: CheckpointStore {
    /// Store a serializable value at the specified key.
    async fn put_json<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
    ) -> StorageResult<()> {
        let data = serde_json::to_vec_pretty(value)?;
        self.put(key, &data).await
    }

    /// Load and deserialize the value at the specified key, or `None` when
    /// the key does not exist.
    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.get(key).await {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(StorageError::KeyNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl<S: CheckpointStore + ?Sized> JsonCheckpointStore for S {}

/// File-backed checkpoint store with atomic replacement.
pub struct FileCheckpointStore {
    base_dir: PathBuf,
    // Serializes writers; readers only ever observe complete files thanks
    // to the rename.
    write_lock: Arc<RwLock<()>>,
}

impl FileCheckpointStore {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> StorageResult<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self {
            base_dir,
            write_lock: Arc::new(RwLock::new(())),
        })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys may contain separators (run/space ids); flatten them so every
        // checkpoint is a single file under the base directory.
        let sanitized: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            })
            .collect();
        self.base_dir.join(format!("{sanitized}.json"))
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn put(&self, key: &str, data: &[u8]) -> StorageResult<()> {
        let _guard = self.write_lock.write().await;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(key, path = %path.display(), bytes = data.len(), "checkpoint written");
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::KeyNotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(tokio::fs::try_exists(self.path_for(key)).await?)
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let _guard = self.write_lock.write().await;
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        id: String,
        count: u32,
    }

    #[tokio::test]
    async fn file_store_round_trips_json() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path()).unwrap();
        let value = Sample {
            id: "run-1".to_string(),
            count: 3,
        };

        store.put_json("attestations/run-1", &value).await.unwrap();
        let loaded: Option<Sample> = store.get_json("attestations/run-1").await.unwrap();
        assert_eq!(loaded, Some(value));
    }

    #[tokio::test]
    async fn missing_key_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path()).unwrap();
        let loaded: Option<Sample> = store.get_json("absent").await.unwrap();
        assert!(loaded.is_none());
        assert!(!store.exists("absent").await.unwrap());
    }

    #[tokio::test]
    async fn put_replaces_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path()).unwrap();
        store.put("k", b"one").await.unwrap();
        store.put("k", b"two").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), b"two");
        store.delete("k").await.unwrap();
        assert!(!store.exists("k").await.unwrap());
    }
}
