use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use uuid::Uuid;

/// Blob store backend types
///
/// Defined in core because configuration selects it and the storage crate
/// builds the matching implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobBackend {
    Memory,
    Local,
}

impl FromStr for BlobBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(BlobBackend::Memory),
            "local" => Ok(BlobBackend::Local),
            _ => Err(anyhow::anyhow!("Invalid blob backend: {}", s)),
        }
    }
}

impl Display for BlobBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            BlobBackend::Memory => write!(f, "memory"),
            BlobBackend::Local => write!(f, "local"),
        }
    }
}

/// Reference to a blob held by a transient blob store.
///
/// A handle stays valid until it is revoked; fetching a revoked handle fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct BlobHandle(Uuid);

impl BlobHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn id(&self) -> Uuid {
        self.0
    }
}

impl Default for BlobHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for BlobHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "blob:{}", self.0)
    }
}
