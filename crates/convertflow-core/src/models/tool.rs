//! Declarative per-tool configuration.
//!
//! A [`ToolSpec`] captures everything that differs between tool pages: the
//! remote endpoint, the intake policy, how the payload is encoded, which
//! parameters travel with it and how output files are named.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ARCHIVE_NAME, DEFAULT_FILE_FIELD, DEFAULT_MAX_FILES, DEFAULT_MAX_FILE_SIZE_BYTES,
    DEFAULT_PAST_TENSE,
};
use crate::filename::FilenameRule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    Image,
    Ai,
    Pdf,
    Video,
    Audio,
}

impl std::fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ToolCategory::Image => "image",
            ToolCategory::Ai => "ai",
            ToolCategory::Pdf => "pdf",
            ToolCategory::Video => "video",
            ToolCategory::Audio => "audio",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for ToolCategory {
    type Err = crate::ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" => Ok(ToolCategory::Image),
            "ai" => Ok(ToolCategory::Ai),
            "pdf" => Ok(ToolCategory::Pdf),
            "video" => Ok(ToolCategory::Video),
            "audio" => Ok(ToolCategory::Audio),
            other => Err(crate::ConvertError::InvalidParameter(format!(
                "Unknown category: {}",
                other
            ))),
        }
    }
}

/// How the input file and parameters are put on the wire. This is a contract
/// with the remote handler and must match exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PayloadEncoding {
    /// `multipart/form-data`: raw file part plus one string field per parameter
    Multipart {
        #[serde(default = "default_file_field")]
        file_field: String,
    },
    /// `application/json`: base64 file (no data-URL prefix) plus typed parameter fields
    JsonBase64 {
        #[serde(default = "default_file_field")]
        file_field: String,
    },
}

impl PayloadEncoding {
    pub fn multipart() -> Self {
        PayloadEncoding::Multipart {
            file_field: default_file_field(),
        }
    }

    pub fn json_base64() -> Self {
        PayloadEncoding::JsonBase64 {
            file_field: default_file_field(),
        }
    }

    pub fn file_field(&self) -> &str {
        match self {
            PayloadEncoding::Multipart { file_field } | PayloadEncoding::JsonBase64 { file_field } => {
                file_field
            }
        }
    }
}

/// How selected files map onto requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DispatchStrategy {
    /// One request per file, issued strictly one after another
    #[default]
    PerFile,
    /// All files in one multipart request as `file_0..file_n` plus `fileCount`
    Combined {
        output_prefix: String,
        output_extension: String,
        #[serde(default = "default_min_files")]
        min_files: usize,
    },
}

/// What a successful response body contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    /// The converted file
    #[default]
    Binary,
    /// A JSON report (preview/scan endpoints)
    Report,
}

/// Which [`ConversionParameters`](super::ConversionParameters) field feeds a wire field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKey {
    Quality,
    Width,
    Height,
    Percentage,
    Mode,
    MaintainAspectRatio,
    UpscaleFactor,
    BackgroundType,
    BackgroundColor,
    /// Free-form field looked up in the parameters' `extra` map
    Extra(String),
}

/// When a parameter must be present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    #[default]
    Optional,
    Always,
    /// Required, and only sent, when the effective mode is one of these
    WhenMode(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamBinding {
    /// Field name on the wire (e.g. `quality`, `resizeMode`)
    pub wire: String,
    pub key: ParamKey,
    #[serde(default)]
    pub required: Requirement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

impl ParamBinding {
    pub fn new(wire: &str, key: ParamKey) -> Self {
        Self {
            wire: wire.to_string(),
            key,
            required: Requirement::Optional,
            default: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = Requirement::Always;
        self
    }

    pub fn when_mode(mut self, modes: &[&str]) -> Self {
        self.required = Requirement::WhenMode(modes.iter().map(|m| m.to_string()).collect());
        self
    }

    pub fn with_default(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub slug: String,
    pub category: ToolCategory,
    /// Path of the remote handler, e.g. `/api/image/avif-to-jpg`
    pub endpoint: String,
    pub accepted_types: Vec<String>,
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    pub encoding: PayloadEncoding,
    #[serde(default)]
    pub dispatch: DispatchStrategy,
    #[serde(default)]
    pub response: ResponseKind,
    #[serde(default)]
    pub params: Vec<ParamBinding>,
    pub filename_rule: FilenameRule,
    #[serde(default = "default_archive_name")]
    pub archive_name: String,
    /// Verb used in batch summaries ("3 files converted successfully")
    #[serde(default = "default_past_tense")]
    pub past_tense: String,
}

impl ToolSpec {
    pub fn is_report(&self) -> bool {
        self.response == ResponseKind::Report
    }

    pub fn is_combined(&self) -> bool {
        matches!(self.dispatch, DispatchStrategy::Combined { .. })
    }

    pub fn accepts_image_types(&self) -> bool {
        self.accepted_types.iter().any(|t| t.starts_with("image/"))
    }
}

fn default_file_field() -> String {
    DEFAULT_FILE_FIELD.to_string()
}

fn default_min_files() -> usize {
    2
}

fn default_max_files() -> usize {
    DEFAULT_MAX_FILES
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE_BYTES
}

fn default_archive_name() -> String {
    DEFAULT_ARCHIVE_NAME.to_string()
}

fn default_past_tense() -> String {
    DEFAULT_PAST_TENSE.to_string()
}
