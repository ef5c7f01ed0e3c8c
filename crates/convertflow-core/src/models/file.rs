use std::path::Path;

use bytes::Bytes;
use serde::Serialize;
use uuid::Uuid;

use crate::BlobHandle;

/// A file offered to intake, before any policy is applied.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub name: String,
    /// Declared MIME type; inferred from the extension when absent.
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl CandidateFile {
    pub fn new(name: impl Into<String>, content_type: Option<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type,
            data: data.into(),
        }
    }

    /// Read a candidate from disk. The MIME type is left to extension inference.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        if path
            .components()
            .any(|c| c == std::path::Component::ParentDir)
        {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Invalid input: {}", path.display()),
            ));
        }
        let data = std::fs::read(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file")
            .to_string();

        Ok(Self::new(name, None, data))
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Declared MIME type, or the one implied by the extension, lowercased.
    pub fn effective_content_type(&self) -> String {
        self.content_type
            .as_deref()
            .filter(|ct| !ct.trim().is_empty())
            .map(|ct| ct.trim().to_lowercase())
            .or_else(|| content_type_for_filename(&self.name).map(str::to_string))
            .unwrap_or_else(|| "application/octet-stream".to_string())
    }
}

/// A user-chosen input awaiting conversion.
#[derive(Debug, Clone, Serialize)]
pub struct SelectedFile {
    pub id: Uuid,
    pub name: String,
    pub size: u64,
    pub content_type: String,
    #[serde(skip)]
    pub data: Bytes,
    /// Local preview reference, only for image types. Must be revoked when the
    /// file is removed or replaced.
    pub preview: Option<BlobHandle>,
}

impl SelectedFile {
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

/// MIME type implied by a filename's extension, if known.
pub fn content_type_for_filename(filename: &str) -> Option<&'static str> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())?
        .to_lowercase();
    content_type_for_extension(&extension)
}

/// Map common extensions to their canonical Content-Type.
pub fn content_type_for_extension(extension: &str) -> Option<&'static str> {
    let ct = match extension {
        // Images
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "ico" => "image/x-icon",
        // Videos
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        // Audio
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        "flac" => "audio/flac",
        "aac" => "audio/aac",
        // Documents
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "json" => "application/json",
        "txt" => "text/plain",
        _ => return None,
    };
    Some(ct)
}
