use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::traits::{BlobStore, StorageError, StorageResult};
use crate::{BlobBackend, BlobHandle};

/// In-process blob store
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<Uuid, Bytes>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, data: Bytes) -> StorageResult<BlobHandle> {
        let handle = BlobHandle::new();
        let size = data.len();
        self.blobs.write().await.insert(handle.id(), data);

        tracing::debug!(blob = %handle, size_bytes = size, "Blob stored in memory");
        Ok(handle)
    }

    async fn fetch(&self, handle: &BlobHandle) -> StorageResult<Bytes> {
        self.blobs
            .read()
            .await
            .get(&handle.id())
            .cloned()
            .ok_or(StorageError::NotFound(*handle))
    }

    async fn revoke(&self, handle: &BlobHandle) -> StorageResult<()> {
        if self.blobs.write().await.remove(&handle.id()).is_some() {
            tracing::debug!(blob = %handle, "Blob revoked");
        }
        Ok(())
    }

    async fn contains(&self, handle: &BlobHandle) -> StorageResult<bool> {
        Ok(self.blobs.read().await.contains_key(&handle.id()))
    }

    async fn live_count(&self) -> StorageResult<usize> {
        Ok(self.blobs.read().await.len())
    }

    fn backend_type(&self) -> BlobBackend {
        BlobBackend::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_fetch_revoke() {
        let store = MemoryBlobStore::new();
        let handle = store.put(Bytes::from_static(b"converted")).await.unwrap();

        assert_eq!(store.fetch(&handle).await.unwrap(), Bytes::from_static(b"converted"));
        assert_eq!(store.live_count().await.unwrap(), 1);

        store.revoke(&handle).await.unwrap();
        assert!(!store.contains(&handle).await.unwrap());
        assert!(matches!(
            store.fetch(&handle).await,
            Err(StorageError::NotFound(_))
        ));
        assert_eq!(store.live_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let store = MemoryBlobStore::new();
        let handle = store.put(Bytes::from_static(b"x")).await.unwrap();
        store.revoke(&handle).await.unwrap();
        assert!(store.revoke(&handle).await.is_ok());
        assert!(store.revoke(&BlobHandle::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_handles_are_distinct() {
        let store = MemoryBlobStore::new();
        let a = store.put(Bytes::from_static(b"a")).await.unwrap();
        let b = store.put(Bytes::from_static(b"b")).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.fetch(&b).await.unwrap(), Bytes::from_static(b"b"));
    }
}
