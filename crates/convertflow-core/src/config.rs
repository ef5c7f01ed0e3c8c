//! Configuration module
//!
//! Client-side settings read from the environment (after `.env` loading):
//! where the conversion API lives, intake limits, where downloads land and
//! which blob store backs transient results.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::blob_types::BlobBackend;
use crate::catalog::ToolCatalog;
use crate::constants::{DEFAULT_API_URL, DEFAULT_MAX_FILES};
use crate::ConvertError;

const DEFAULT_MAX_FILE_SIZE_MB: u64 = 50;

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_url: String,
    /// Sent as `X-API-Key` when set
    pub api_key: Option<String>,
    /// Per-request timeout. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
    pub max_file_size_bytes: u64,
    pub max_files: usize,
    pub output_dir: PathBuf,
    pub blob_backend: BlobBackend,
    pub blob_path: Option<PathBuf>,
    /// Optional JSON catalog merged over the built-in tools
    pub tools_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            request_timeout: None,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_MB * 1024 * 1024,
            max_files: DEFAULT_MAX_FILES,
            output_dir: PathBuf::from("."),
            blob_backend: BlobBackend::Memory,
            blob_path: None,
            tools_file: None,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let max_file_size_bytes = lookup("CONVERTFLOW_MAX_FILE_SIZE_MB")
            .unwrap_or_else(|| DEFAULT_MAX_FILE_SIZE_MB.to_string())
            .parse::<u64>()
            .ok()
            .and_then(|mb| mb.checked_mul(1024 * 1024))
            .ok_or_else(|| anyhow::anyhow!("CONVERTFLOW_MAX_FILE_SIZE_MB must be a valid number"))?;

        let request_timeout = match lookup("CONVERTFLOW_REQUEST_TIMEOUT_SECS") {
            Some(raw) if !raw.trim().is_empty() => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    anyhow::anyhow!("CONVERTFLOW_REQUEST_TIMEOUT_SECS must be a valid number")
                })?;
                Some(Duration::from_secs(secs))
            }
            _ => None,
        };

        let config = Self {
            api_url: lookup("CONVERTFLOW_API_URL")
                .unwrap_or_else(|| DEFAULT_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key: lookup("CONVERTFLOW_API_KEY").filter(|k| !k.is_empty()),
            request_timeout,
            max_file_size_bytes,
            max_files: lookup("CONVERTFLOW_MAX_FILES")
                .unwrap_or_else(|| DEFAULT_MAX_FILES.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("CONVERTFLOW_MAX_FILES must be a valid number"))?,
            output_dir: lookup("CONVERTFLOW_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            blob_backend: lookup("CONVERTFLOW_BLOB_BACKEND")
                .unwrap_or_else(|| "memory".to_string())
                .parse()?,
            blob_path: lookup("CONVERTFLOW_BLOB_PATH").map(PathBuf::from),
            tools_file: lookup("CONVERTFLOW_TOOLS_FILE").map(PathBuf::from),
        };

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(anyhow::anyhow!(
                "CONVERTFLOW_API_URL must start with http:// or https://"
            ));
        }

        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!(
                "CONVERTFLOW_MAX_FILE_SIZE_MB must be greater than 0"
            ));
        }

        if self.max_files == 0 {
            return Err(anyhow::anyhow!("CONVERTFLOW_MAX_FILES must be greater than 0"));
        }

        if self.request_timeout == Some(Duration::ZERO) {
            return Err(anyhow::anyhow!(
                "CONVERTFLOW_REQUEST_TIMEOUT_SECS must be greater than 0 when set"
            ));
        }

        if self.blob_backend == BlobBackend::Local && self.blob_path.is_none() {
            return Err(anyhow::anyhow!(
                "CONVERTFLOW_BLOB_BACKEND=local requires CONVERTFLOW_BLOB_PATH to be set"
            ));
        }

        Ok(())
    }

    /// Built-in tools merged with the optional tools file. Tool limits are
    /// capped by the configured global limits.
    pub fn load_catalog(&self) -> Result<ToolCatalog, ConvertError> {
        let mut catalog = ToolCatalog::builtin();
        if let Some(path) = &self.tools_file {
            tracing::info!(path = %path.display(), "Loading tool catalog");
            catalog.merge(ToolCatalog::from_json_file(path)?);
        }

        let mut capped = ToolCatalog::empty();
        for tool in catalog.list(None) {
            let mut tool = tool.clone();
            tool.max_files = tool.max_files.min(self.max_files);
            tool.max_file_size = tool.max_file_size.min(self.max_file_size_bytes);
            capped.insert(tool);
        }
        Ok(capped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ClientConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.api_url, "http://localhost:3000");
        assert_eq!(config.max_file_size_bytes, 50 * 1024 * 1024);
        assert_eq!(config.max_files, 10);
        assert_eq!(config.request_timeout, None);
        assert_eq!(config.blob_backend, BlobBackend::Memory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_values_are_parsed() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("CONVERTFLOW_API_URL", "https://convert.example.com/"),
            ("CONVERTFLOW_API_KEY", "secret"),
            ("CONVERTFLOW_REQUEST_TIMEOUT_SECS", "30"),
            ("CONVERTFLOW_MAX_FILE_SIZE_MB", "5"),
            ("CONVERTFLOW_MAX_FILES", "3"),
            ("CONVERTFLOW_BLOB_BACKEND", "local"),
            ("CONVERTFLOW_BLOB_PATH", "/tmp/blobs"),
        ]))
        .unwrap();

        assert_eq!(config.api_url, "https://convert.example.com");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.max_file_size_bytes, 5 * 1024 * 1024);
        assert_eq!(config.max_files, 3);
        assert_eq!(config.blob_backend, BlobBackend::Local);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let result = ClientConfig::from_lookup(lookup_from(&[("CONVERTFLOW_MAX_FILES", "many")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_oversized_file_limit_is_rejected() {
        let err = ClientConfig::from_lookup(lookup_from(&[(
            "CONVERTFLOW_MAX_FILE_SIZE_MB",
            "18446744073709551615",
        )]))
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "CONVERTFLOW_MAX_FILE_SIZE_MB must be a valid number"
        );
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let config = ClientConfig {
            max_files: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ClientConfig {
            request_timeout: Some(Duration::ZERO),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_blob_path_for_local() {
        let config = ClientConfig {
            blob_backend: BlobBackend::Local,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("CONVERTFLOW_BLOB_PATH"));
    }

    #[test]
    fn test_catalog_limits_are_capped() {
        let config = ClientConfig {
            max_files: 4,
            max_file_size_bytes: 1024,
            ..Default::default()
        };
        let catalog = config.load_catalog().unwrap();
        let tool = catalog.get("avif-to-jpg").unwrap();
        assert_eq!(tool.max_files, 4);
        assert_eq!(tool.max_file_size, 1024);
    }
}
