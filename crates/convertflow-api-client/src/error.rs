use convertflow_core::ConvertError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Non-2xx response. `detail` carries the body's `error`/`details` text when present.
    #[error("Request failed with status {status}: {message}")]
    Status {
        status: u16,
        message: String,
        detail: Option<String>,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            ClientError::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Transport(e) if e.is_timeout())
    }
}

impl From<ClientError> for ConvertError {
    fn from(err: ClientError) -> Self {
        ConvertError::Request {
            status: err.status(),
            detail: err.detail().map(str::to_string),
            message: err.to_string(),
        }
    }
}

/// Pull the user-facing text out of an error body: `error` first, then `details`.
pub(crate) fn extract_error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error", "details"]
        .iter()
        .filter_map(|key| value.get(*key))
        .filter_map(|v| v.as_str())
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}
