use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use convertflow_core::models::ConversionResult;
use convertflow_core::ConvertError;
use convertflow_storage::BlobStore;
use futures::future::try_join_all;

use crate::download::{sanitize_filename, DownloadTrigger};

/// Entry names for `results`: base names only, with ` (n)` inserted before
/// the extension when a name repeats.
pub fn unique_entry_names(results: &[ConversionResult]) -> Vec<String> {
    let mut used = HashSet::new();
    results
        .iter()
        .enumerate()
        .map(|(index, result)| {
            let base = sanitize_filename(&result.filename, &format!("unnamed_{}", index + 1));
            if used.insert(base.clone()) {
                return base;
            }

            let path = Path::new(&base);
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(&base)
                .to_string();
            let ext = path.extension().and_then(|e| e.to_str());

            let mut n = 1;
            loop {
                let candidate = match ext {
                    Some(ext) => format!("{} ({}).{}", stem, n, ext),
                    None => format!("{} ({})", stem, n),
                };
                if used.insert(candidate.clone()) {
                    return candidate;
                }
                n += 1;
            }
        })
        .collect()
}

/// Builds a ZIP of converted results and hands it to the download trigger.
///
/// Results are re-fetched from the blob store concurrently and joined; one
/// failed fetch fails the whole archive. Result handles are never revoked
/// here, so individual downloads keep working after an archive failure.
#[derive(Clone)]
pub struct ArchivePackager {
    store: Arc<dyn BlobStore>,
}

impl ArchivePackager {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    /// Create the ZIP bytes for `results`.
    #[tracing::instrument(skip(self, results), fields(entries = results.len()))]
    pub async fn build(&self, results: &[ConversionResult]) -> Result<Vec<u8>, ConvertError> {
        if results.len() < 2 {
            return Err(ConvertError::UnsupportedOperation(
                "An archive needs more than one result".to_string(),
            ));
        }

        let contents: Vec<Bytes> = try_join_all(results.iter().map(|r| self.store.fetch(&r.blob)))
            .await
            .map_err(|e| ConvertError::Archive(format!("Failed to fetch result: {}", e)))?;

        let names = unique_entry_names(results);
        write_zip(names.iter().map(String::as_str).zip(contents.iter()))
    }

    /// Build the archive, store it, write it as `archive_name` and revoke the
    /// archive handle right after.
    pub async fn package(
        &self,
        results: &[ConversionResult],
        archive_name: &str,
        trigger: &DownloadTrigger,
    ) -> Result<PathBuf, ConvertError> {
        let start = std::time::Instant::now();
        let archive = self.build(results).await?;
        let size = archive.len();

        let handle = self
            .store
            .put(Bytes::from(archive))
            .await
            .map_err(|e| ConvertError::Archive(format!("Failed to store archive: {}", e)))?;

        let path = trigger
            .download_and_revoke(&handle, archive_name)
            .await
            .map_err(|e| ConvertError::Archive(format!("Failed to write archive: {}", e)))?;

        tracing::info!(
            path = %path.display(),
            entries = results.len(),
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Archive downloaded"
        );
        Ok(path)
    }
}

fn write_zip<'a>(entries: impl Iterator<Item = (&'a str, &'a Bytes)>) -> Result<Vec<u8>, ConvertError> {
    use zip::write::{FileOptions, ZipWriter};
    use zip::CompressionMethod;

    let mut buffer = Vec::new();
    {
        let mut zip = ZipWriter::new(std::io::Cursor::new(&mut buffer));
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644);

        for (name, data) in entries {
            zip.start_file(name, options).map_err(|e| {
                ConvertError::Archive(format!("Failed to add {} to ZIP: {}", name, e))
            })?;
            zip.write_all(data).map_err(|e| {
                ConvertError::Archive(format!("Failed to write {} to ZIP: {}", name, e))
            })?;
        }

        zip.finish()
            .map_err(|e| ConvertError::Archive(format!("Failed to finalize ZIP: {}", e)))?;
    }

    Ok(buffer)
}
