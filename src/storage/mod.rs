//! Blob storage for audio artifacts
//!
//! Audio segments are stored as opaque blobs addressed by an
//! implementation-chosen reference string. The filesystem store keeps one
//! file per blob under a data directory; the in-memory store backs tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};

#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// Store a blob, returning its reference.
    async fn put(&self, data: &[u8]) -> Result<String>;

    /// Fetch a blob by reference.
    async fn get(&self, reference: &str) -> Result<Vec<u8>>;

    /// Delete a blob by reference.
    async fn delete(&self, reference: &str) -> Result<()>;
}

/// Filesystem-backed blob store, one file per blob.
pub struct FsBlobStore {
    data_dir: PathBuf,
}

impl FsBlobStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)
            .map_err(|e| Error::storage(format!("Failed to create data directory: {e}")))?;
        Ok(Self { data_dir })
    }

    fn path_for(&self, reference: &str) -> Result<PathBuf> {
        // References are single path components; reject anything that
        // could escape the data directory.
        if reference.is_empty() || reference.contains(['/', '\\', '.']) {
            return Err(Error::storage(format!("Invalid blob reference: {reference}")));
        }
        Ok(self.data_dir.join(reference))
    }
}

#[async_trait::async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, data: &[u8]) -> Result<String> {
        let reference = format!("blob-{}", Uuid::new_v4().simple());
        let path = self.path_for(&reference)?;

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| Error::storage(format!("Failed to write blob {reference}: {e}")))?;

        debug!("Stored blob {} ({} bytes)", reference, data.len());
        Ok(reference)
    }

    async fn get(&self, reference: &str) -> Result<Vec<u8>> {
        let path = self.path_for(reference)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| Error::storage(format!("Failed to read blob {reference}: {e}")))
    }

    async fn delete(&self, reference: &str) -> Result<()> {
        let path = self.path_for(reference)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| Error::storage(format!("Failed to delete blob {reference}: {e}")))
    }
}

/// In-memory blob store for tests and ephemeral setups.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a blob with this reference is currently held.
    pub async fn contains(&self, reference: &str) -> bool {
        self.blobs.read().await.contains_key(reference)
    }

    /// Number of blobs currently held.
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, data: &[u8]) -> Result<String> {
        let reference = format!("blob-{}", Uuid::new_v4().simple());
        self.blobs
            .write()
            .await
            .insert(reference.clone(), data.to_vec());
        Ok(reference)
    }

    async fn get(&self, reference: &str) -> Result<Vec<u8>> {
        self.blobs
            .read()
            .await
            .get(reference)
            .cloned()
            .ok_or_else(|| Error::storage(format!("Blob not found: {reference}")))
    }

    async fn delete(&self, reference: &str) -> Result<()> {
        self.blobs
            .write()
            .await
            .remove(reference)
            .map(|_| ())
            .ok_or_else(|| Error::storage(format!("Blob not found: {reference}")))
    }
}
