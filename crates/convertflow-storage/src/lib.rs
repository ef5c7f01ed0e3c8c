//! Convertflow Storage Library
//!
//! Transient blob storage for converted results. A blob lives behind a
//! [`BlobHandle`] from `put` until `revoke`; fetching a revoked handle fails.
//! Results stay in the store while the user may still download them, and the
//! archive packager re-fetches them from here.

pub mod factory;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use convertflow_core::{BlobBackend, BlobHandle};
pub use factory::create_blob_store;
#[cfg(feature = "storage-local")]
pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;
pub use traits::{BlobStore, StorageError, StorageResult};
