//! Object storage log source
//! Uses Apache Arrow object_store crate

use async_trait::async_trait;
use bytes::Bytes;
use object_store::{
    ObjectStore,
    path::{Path as StoragePath, PathPart},
};
use std::path::Path;
use std::sync::Arc;

use super::{LogSource, Result, SourceError, check_size};
use crate::cache::JobKey;

/// Reads job logs stored as `{org}/{pipeline}/{build}/{job}.log`
#[derive(Clone)]
pub struct ObjectStoreSource {
    store: Arc<dyn ObjectStore>,
    max_log_bytes: u64,
}

impl ObjectStoreSource {
    /// Create a source over any object_store backend
    pub fn new(store: Arc<dyn ObjectStore>, max_log_bytes: u64) -> Self {
        Self {
            store,
            max_log_bytes,
        }
    }

    /// Logs laid out on the local filesystem under `root`
    pub fn local(root: impl AsRef<Path>, max_log_bytes: u64) -> Result<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root).map_err(|e| {
            SourceError::InvalidConfig(format!("cannot create {}: {}", root.display(), e))
        })?;
        let store = object_store::local::LocalFileSystem::new_with_prefix(root)?;
        Ok(Self::new(Arc::new(store), max_log_bytes))
    }

    /// In-memory storage for testing/development
    pub fn in_memory() -> Self {
        Self::new(Arc::new(object_store::memory::InMemory::new()), 0)
    }

    /// `{org}/{pipeline}/{build}/{job}.log`, each segment escaped on its own
    pub fn object_path(key: &JobKey) -> StoragePath {
        let file = format!("{}.log", key.job);
        StoragePath::from_iter([
            PathPart::from(key.org.as_str()),
            PathPart::from(key.pipeline.as_str()),
            PathPart::from(key.build.as_str()),
            PathPart::from(file),
        ])
    }

    /// Store a raw log, used to seed local and in-memory sources
    pub async fn put(&self, key: &JobKey, raw: impl Into<Bytes>) -> Result<()> {
        let bytes: Bytes = raw.into();
        let size = bytes.len();
        self.store.put(&Self::object_path(key), bytes.into()).await?;
        tracing::info!(job = %key, size, "Stored raw log");
        Ok(())
    }
}

#[async_trait]
impl LogSource for ObjectStoreSource {
    async fn fetch(&self, key: &JobKey) -> Result<Bytes> {
        let path = Self::object_path(key);

        let result = match self.store.get(&path).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(SourceError::NotFound(key.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        check_size(key, result.meta.size, self.max_log_bytes)?;

        let bytes = result.bytes().await?;
        tracing::debug!(job = %key, size = bytes.len(), "Read raw log from object store");
        Ok(bytes)
    }
}
