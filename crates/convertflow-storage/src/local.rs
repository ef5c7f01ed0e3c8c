use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::traits::{BlobStore, StorageError, StorageResult};
use crate::{BlobBackend, BlobHandle};

const BLOB_EXTENSION: &str = "blob";

/// Blob store backed by a local directory, one file per handle
#[derive(Clone)]
pub struct LocalBlobStore {
    base_path: PathBuf,
}

impl LocalBlobStore {
    /// Create a new LocalBlobStore rooted at `base_path`, creating it if needed
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create blob directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalBlobStore { base_path })
    }

    /// Handles are UUIDs, so the path can never leave the base directory.
    fn handle_to_path(&self, handle: &BlobHandle) -> PathBuf {
        self.base_path
            .join(format!("{}.{}", handle.id().simple(), BLOB_EXTENSION))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, data: Bytes) -> StorageResult<BlobHandle> {
        let handle = BlobHandle::new();
        let path = self.handle_to_path(&handle);
        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.flush().await?;

        tracing::debug!(
            path = %path.display(),
            blob = %handle,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Blob stored on disk"
        );

        Ok(handle)
    }

    async fn fetch(&self, handle: &BlobHandle) -> StorageResult<Bytes> {
        let path = self.handle_to_path(handle);

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(*handle));
        }

        let data = fs::read(&path).await.map_err(|e| {
            StorageError::ReadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        Ok(Bytes::from(data))
    }

    async fn revoke(&self, handle: &BlobHandle) -> StorageResult<()> {
        let path = self.handle_to_path(handle);

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(blob = %handle, "Blob revoked");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::IoError(e)),
        }
    }

    async fn contains(&self, handle: &BlobHandle) -> StorageResult<bool> {
        Ok(fs::try_exists(self.handle_to_path(handle)).await?)
    }

    async fn live_count(&self) -> StorageResult<usize> {
        let mut entries = fs::read_dir(&self.base_path).await?;
        let mut count = 0;
        while let Some(entry) = entries.next_entry().await? {
            if entry.path().extension().and_then(|e| e.to_str()) == Some(BLOB_EXTENSION) {
                count += 1;
            }
        }
        Ok(count)
    }

    fn backend_type(&self) -> BlobBackend {
        BlobBackend::Local
    }
}
