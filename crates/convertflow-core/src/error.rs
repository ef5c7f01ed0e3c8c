//! Error types module
//!
//! All orchestration failures are unified under [`ConvertError`]. Each variant
//! belongs to one class of the failure taxonomy (selection, per-item request,
//! batch, archive) and self-describes how it is presented to the user through
//! [`ErrorMetadata`].

use std::io;

use crate::size::format_file_size;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like selection failures
    Debug,
    /// Warning level - for recoverable issues like a failed request
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Failure class an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Rejected during intake or parameter checks, before any network activity
    Selection,
    /// A single remote conversion call failed
    Request,
    /// Every item of a batch failed
    Batch,
    /// Building or delivering the archive failed
    Archive,
    /// Local environment problems (config, storage, IO)
    Environment,
}

/// Metadata for user-facing notifications - defines how an error is presented
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "FILE_TOO_LARGE")
    fn error_code(&self) -> &'static str;

    /// Whether re-triggering the operation may succeed
    fn is_recoverable(&self) -> bool;

    /// Message shown to the user (may differ from the internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;

    /// Failure class of this error
    fn class(&self) -> ErrorClass;
}

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("File too large: {name} is {size} bytes (max: {max} bytes)")]
    FileTooLarge { name: String, size: u64, max: u64 },

    #[error("Invalid file type: {name} has type {content_type} (accepted: {accepted:?})")]
    InvalidFileType {
        name: String,
        content_type: String,
        accepted: Vec<String>,
    },

    #[error("Too many files: {submitted} submitted (max: {max})")]
    TooManyFiles { submitted: usize, max: usize },

    #[error("No files selected")]
    NoFilesSelected,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("A conversion is already in progress")]
    Busy,

    #[error("Request failed{}: {message}", .status.map(|s| format!(" with status {}", s)).unwrap_or_default())]
    Request {
        status: Option<u16>,
        message: String,
        /// Text taken from the response body's `error`/`details` field
        detail: Option<String>,
    },

    #[error("All {0} conversions failed")]
    AllFailed(usize),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<validator::ValidationErrors> for ConvertError {
    fn from(err: validator::ValidationErrors) -> Self {
        ConvertError::InvalidParameter(format!("Validation error: {}", err))
    }
}

/// Static metadata for each variant: (error_code, recoverable, log_level, class).
fn convert_error_static_metadata(
    err: &ConvertError,
) -> (&'static str, bool, LogLevel, ErrorClass) {
    match err {
        ConvertError::FileTooLarge { .. } => (
            "FILE_TOO_LARGE",
            false,
            LogLevel::Debug,
            ErrorClass::Selection,
        ),
        ConvertError::InvalidFileType { .. } => (
            "INVALID_FILE_TYPE",
            false,
            LogLevel::Debug,
            ErrorClass::Selection,
        ),
        ConvertError::TooManyFiles { .. } => (
            "TOO_MANY_FILES",
            false,
            LogLevel::Debug,
            ErrorClass::Selection,
        ),
        ConvertError::NoFilesSelected => (
            "NO_FILES_SELECTED",
            false,
            LogLevel::Debug,
            ErrorClass::Selection,
        ),
        ConvertError::InvalidParameter(_) => (
            "INVALID_PARAMETER",
            false,
            LogLevel::Debug,
            ErrorClass::Selection,
        ),
        ConvertError::UnknownTool(_) => (
            "UNKNOWN_TOOL",
            false,
            LogLevel::Debug,
            ErrorClass::Selection,
        ),
        ConvertError::UnsupportedOperation(_) => (
            "UNSUPPORTED_OPERATION",
            false,
            LogLevel::Debug,
            ErrorClass::Selection,
        ),
        ConvertError::Busy => ("BUSY", true, LogLevel::Debug, ErrorClass::Selection),
        ConvertError::Request { .. } => (
            "REQUEST_FAILED",
            true,
            LogLevel::Warn,
            ErrorClass::Request,
        ),
        ConvertError::AllFailed(_) => ("ALL_FAILED", true, LogLevel::Warn, ErrorClass::Batch),
        ConvertError::Archive(_) => (
            "ARCHIVE_FAILED",
            true,
            LogLevel::Warn,
            ErrorClass::Archive,
        ),
        ConvertError::Storage(_) => (
            "STORAGE_ERROR",
            true,
            LogLevel::Error,
            ErrorClass::Environment,
        ),
        ConvertError::Config(_) => (
            "CONFIG_ERROR",
            false,
            LogLevel::Error,
            ErrorClass::Environment,
        ),
        ConvertError::Io(_) => ("IO_ERROR", true, LogLevel::Error, ErrorClass::Environment),
        ConvertError::Json(_) => (
            "JSON_ERROR",
            false,
            LogLevel::Error,
            ErrorClass::Environment,
        ),
    }
}

impl ErrorMetadata for ConvertError {
    fn error_code(&self) -> &'static str {
        convert_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        convert_error_static_metadata(self).1
    }

    fn log_level(&self) -> LogLevel {
        convert_error_static_metadata(self).2
    }

    fn class(&self) -> ErrorClass {
        convert_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            ConvertError::FileTooLarge { max, .. } => {
                format!("File size must be less than {}", format_file_size(*max))
            }
            ConvertError::InvalidFileType { accepted, .. } => format!(
                "File type not supported. Accepted types: {}",
                accepted.join(", ")
            ),
            ConvertError::TooManyFiles { max, .. } => {
                format!("Too many files. You can select up to {} files", max)
            }
            ConvertError::NoFilesSelected => "Please select files first".to_string(),
            ConvertError::InvalidParameter(ref msg) => msg.clone(),
            ConvertError::UnknownTool(ref slug) => format!("Unknown tool: {}", slug),
            ConvertError::UnsupportedOperation(ref msg) => msg.clone(),
            ConvertError::Busy => "A conversion is already in progress".to_string(),
            ConvertError::Request { detail, .. } => detail
                .clone()
                .unwrap_or_else(|| crate::constants::SINGLE_FAILURE_MESSAGE.to_string()),
            ConvertError::AllFailed(_) => crate::constants::ALL_FAILED_MESSAGE.to_string(),
            ConvertError::Archive(_) => crate::constants::ARCHIVE_FAILURE_MESSAGE.to_string(),
            ConvertError::Storage(_) | ConvertError::Io(_) => {
                "Could not access local files".to_string()
            }
            ConvertError::Config(ref msg) => msg.clone(),
            ConvertError::Json(_) => "Malformed data".to_string(),
        }
    }
}
