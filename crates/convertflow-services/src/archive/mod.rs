//! "Download all" archive packaging.

mod service;

pub use service::{unique_entry_names, ArchivePackager};
