//! Blob store abstraction trait
//!
//! This module defines the BlobStore trait that all blob backends must implement.

use async_trait::async_trait;
use bytes::Bytes;
use convertflow_core::ConvertError;
use thiserror::Error;

use crate::{BlobBackend, BlobHandle};

/// Blob store operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Blob not found or revoked: {0}")]
    NotFound(BlobHandle),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for blob store operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for ConvertError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ConfigError(msg) => ConvertError::Config(msg),
            other => ConvertError::Storage(other.to_string()),
        }
    }
}

/// Transient blob store
///
/// Every handle returned by `put` must eventually be passed to `revoke`.
/// Revoking is idempotent.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes and return a fresh handle
    async fn put(&self, data: Bytes) -> StorageResult<BlobHandle>;

    /// Read the bytes behind a live handle
    async fn fetch(&self, handle: &BlobHandle) -> StorageResult<Bytes>;

    /// Release a handle. Unknown or already revoked handles are not an error.
    async fn revoke(&self, handle: &BlobHandle) -> StorageResult<()>;

    /// Whether a handle is still live
    async fn contains(&self, handle: &BlobHandle) -> StorageResult<bool>;

    /// Number of live handles
    async fn live_count(&self) -> StorageResult<usize>;

    /// Get the blob backend type
    fn backend_type(&self) -> BlobBackend;
}
