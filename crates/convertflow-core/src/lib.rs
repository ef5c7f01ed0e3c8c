//! Convertflow Core Library
//!
//! This crate provides the domain models, the declarative tool catalog, filename
//! rules, error types and configuration shared by every convertflow component.

pub mod blob_types;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod filename;
pub mod models;
pub mod size;

// Re-export commonly used types
pub use blob_types::{BlobBackend, BlobHandle};
pub use catalog::ToolCatalog;
pub use config::ClientConfig;
pub use error::{ConvertError, ErrorClass, ErrorMetadata, LogLevel};
pub use filename::{ExtensionMatch, FilenameRule};
pub use size::format_file_size;
