//! Defaults shared by configuration and the built-in tool catalog.

/// Per-file byte limit applied when a tool does not declare its own.
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 50 * 1024 * 1024;

/// Batch-mode file count limit applied when a tool does not declare its own.
pub const DEFAULT_MAX_FILES: usize = 10;

pub const DEFAULT_ARCHIVE_NAME: &str = "imageoptimizer.in.zip";

pub const DEFAULT_PAST_TENSE: &str = "converted";

pub const DEFAULT_API_URL: &str = "http://localhost:3000";

/// Multipart field carrying the input file unless a tool overrides it.
pub const DEFAULT_FILE_FIELD: &str = "file";

/// Multipart field carrying the number of files for combined requests.
pub const FILE_COUNT_FIELD: &str = "fileCount";

pub const SINGLE_SUCCESS_MESSAGE: &str = "Conversion completed successfully!";
pub const SINGLE_FAILURE_MESSAGE: &str = "Conversion failed. Please try again.";
pub const ALL_FAILED_MESSAGE: &str = "All conversions failed. Please try again.";
pub const ARCHIVE_SUCCESS_MESSAGE: &str = "ZIP file downloaded successfully!";
pub const ARCHIVE_FAILURE_MESSAGE: &str = "Failed to create ZIP file. Please try again.";
