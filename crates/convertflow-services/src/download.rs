//! Download trigger
//!
//! Writes a blob into the output directory under a target filename. The
//! bytes go to a temporary file in the same directory which is then renamed
//! into place, so a failed download never leaves a partial file behind.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use convertflow_core::{BlobHandle, ConvertError};
use convertflow_storage::BlobStore;

/// Strip any path components from a download or archive entry name.
pub(crate) fn sanitize_filename(filename: &str, fallback: &str) -> String {
    Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .unwrap_or(fallback)
        .to_string()
}

#[derive(Clone)]
pub struct DownloadTrigger {
    store: Arc<dyn BlobStore>,
    output_dir: PathBuf,
}

impl DownloadTrigger {
    pub fn new(store: Arc<dyn BlobStore>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write the blob behind `handle` as `filename`. The handle stays live.
    pub async fn download(
        &self,
        handle: &BlobHandle,
        filename: &str,
    ) -> Result<PathBuf, ConvertError> {
        let data = self.store.fetch(handle).await?;
        let name = sanitize_filename(filename, &format!("download_{}", handle.id().simple()));
        let dir = self.output_dir.clone();

        let target = tokio::task::spawn_blocking(move || -> Result<PathBuf, ConvertError> {
            std::fs::create_dir_all(&dir)?;
            let target = dir.join(&name);
            let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
            temp.write_all(&data)?;
            temp.as_file().sync_all()?;
            temp.persist(&target).map_err(|e| ConvertError::Io(e.error))?;
            Ok(target)
        })
        .await
        .map_err(|e| ConvertError::Storage(format!("Download task failed: {}", e)))??;

        tracing::info!(path = %target.display(), blob = %handle, "Download written");
        Ok(target)
    }

    /// Download and then revoke the handle, whether or not the write succeeded.
    pub async fn download_and_revoke(
        &self,
        handle: &BlobHandle,
        filename: &str,
    ) -> Result<PathBuf, ConvertError> {
        let result = self.download(handle, filename).await;
        if let Err(e) = self.store.revoke(handle).await {
            tracing::warn!(blob = %handle, error = %e, "Failed to revoke downloaded blob");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use convertflow_storage::MemoryBlobStore;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("../../etc/passwd", "fallback"), "passwd");
        assert_eq!(sanitize_filename("photo.jpg", "fallback"), "photo.jpg");
        assert_eq!(sanitize_filename("", "fallback"), "fallback");
        assert_eq!(sanitize_filename("..", "fallback"), "fallback");
    }

    #[tokio::test]
    async fn test_download_keeps_handle_live() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryBlobStore::new());
        let handle = store.put(Bytes::from_static(b"jpeg")).await.unwrap();
        let trigger = DownloadTrigger::new(store.clone(), dir.path());

        let path = trigger.download(&handle, "photo.jpg").await.unwrap();
        assert_eq!(path, dir.path().join("photo.jpg"));
        assert_eq!(std::fs::read(&path).unwrap(), b"jpeg");
        assert!(store.contains(&handle).await.unwrap());

        // a second download of the same result still works
        assert!(trigger.download(&handle, "photo.jpg").await.is_ok());
    }

    #[tokio::test]
    async fn test_download_and_revoke_releases_handle() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryBlobStore::new());
        let handle = store.put(Bytes::from_static(b"zip")).await.unwrap();
        let trigger = DownloadTrigger::new(store.clone(), dir.path());

        trigger
            .download_and_revoke(&handle, "results.zip")
            .await
            .unwrap();
        assert_eq!(store.live_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_download_leaves_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryBlobStore::new());
        let trigger = DownloadTrigger::new(store.clone(), dir.path());

        let result = trigger
            .download_and_revoke(&BlobHandle::new(), "missing.zip")
            .await;
        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_path_components_are_stripped() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryBlobStore::new());
        let handle = store.put(Bytes::from_static(b"x")).await.unwrap();
        let trigger = DownloadTrigger::new(store, dir.path());

        let path = trigger.download(&handle, "../escape.png").await.unwrap();
        assert_eq!(path, dir.path().join("escape.png"));
    }
}
