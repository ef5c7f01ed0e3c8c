use std::sync::Arc;

use convertflow_core::ClientConfig;

#[cfg(feature = "storage-local")]
use crate::LocalBlobStore;
use crate::{BlobBackend, BlobStore, MemoryBlobStore, StorageError, StorageResult};

/// Create a blob store based on configuration
pub async fn create_blob_store(config: &ClientConfig) -> StorageResult<Arc<dyn BlobStore>> {
    match config.blob_backend {
        BlobBackend::Memory => Ok(Arc::new(MemoryBlobStore::new())),

        #[cfg(feature = "storage-local")]
        BlobBackend::Local => {
            let base_path = config.blob_path.clone().ok_or_else(|| {
                StorageError::ConfigError("CONVERTFLOW_BLOB_PATH not configured".to_string())
            })?;

            let store = LocalBlobStore::new(base_path).await?;
            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "storage-local"))]
        BlobBackend::Local => Err(StorageError::ConfigError(
            "Local blob backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}
