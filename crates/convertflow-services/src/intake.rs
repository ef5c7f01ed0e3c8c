//! File intake
//!
//! Applies a tool's acceptance policy to candidate files before anything is
//! sent anywhere. Type and size failures refuse the whole drop; an excess
//! count only truncates.

use std::fmt;

use convertflow_core::models::{CandidateFile, SelectedFile, ToolSpec};
use convertflow_core::ConvertError;
use convertflow_storage::BlobStore;
use serde::Serialize;
use uuid::Uuid;

/// Single-file or batch selection. Switching modes clears the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    #[default]
    Single,
    Batch,
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionMode::Single => write!(f, "single"),
            SelectionMode::Batch => write!(f, "batch"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakePolicy {
    /// Lowercased MIME types
    pub accepted_types: Vec<String>,
    pub max_files: usize,
    pub max_file_size: u64,
}

impl IntakePolicy {
    /// Policy for a tool in the given mode. Single mode always allows one file,
    /// except for tools that combine files into one request.
    pub fn for_tool(tool: &ToolSpec, mode: SelectionMode) -> Self {
        let max_files = match mode {
            SelectionMode::Batch => tool.max_files,
            SelectionMode::Single if tool.is_combined() => tool.max_files,
            SelectionMode::Single => 1,
        };

        Self {
            accepted_types: tool
                .accepted_types
                .iter()
                .map(|t| t.to_lowercase())
                .collect(),
            max_files,
            max_file_size: tool.max_file_size,
        }
    }

    fn accepts_type(&self, content_type: &str) -> bool {
        self.accepted_types.is_empty() || self.accepted_types.iter().any(|t| t == content_type)
    }
}

/// Why a candidate was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    TooLarge { name: String, size: u64, max: u64 },
    InvalidType { name: String, content_type: String },
    TooMany { name: String, max: usize },
}

impl Rejection {
    pub fn name(&self) -> &str {
        match self {
            Rejection::TooLarge { name, .. }
            | Rejection::InvalidType { name, .. }
            | Rejection::TooMany { name, .. } => name,
        }
    }

    /// Whether this rejection refuses the whole drop.
    pub fn is_blocking(&self) -> bool {
        !matches!(self, Rejection::TooMany { .. })
    }

    pub fn into_error(self, policy: &IntakePolicy, submitted: usize) -> ConvertError {
        match self {
            Rejection::TooLarge { name, size, max } => ConvertError::FileTooLarge { name, size, max },
            Rejection::InvalidType { name, content_type } => ConvertError::InvalidFileType {
                name,
                content_type,
                accepted: policy.accepted_types.clone(),
            },
            Rejection::TooMany { max, .. } => ConvertError::TooManyFiles { submitted, max },
        }
    }
}

/// Result of partitioning one drop.
#[derive(Debug, Clone)]
pub struct IntakeReport {
    pub accepted: Vec<CandidateFile>,
    pub rejected: Vec<Rejection>,
}

impl IntakeReport {
    pub fn first_blocking(&self) -> Option<&Rejection> {
        self.rejected.iter().find(|r| r.is_blocking())
    }

    pub fn truncated(&self) -> usize {
        self.rejected.iter().filter(|r| !r.is_blocking()).count()
    }
}

/// Files admitted from one drop, plus the count-limit error when some were dropped.
#[derive(Debug)]
pub struct Admission {
    pub files: Vec<SelectedFile>,
    pub truncated: Option<ConvertError>,
}

#[derive(Debug, Clone)]
pub struct FileIntake {
    policy: IntakePolicy,
}

impl FileIntake {
    pub fn new(policy: IntakePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &IntakePolicy {
        &self.policy
    }

    /// Partition candidates. `already_selected` files count against the limit;
    /// excess candidates beyond it are truncated in submission order.
    pub fn partition(&self, candidates: Vec<CandidateFile>, already_selected: usize) -> IntakeReport {
        let mut slots = self.policy.max_files.saturating_sub(already_selected);
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();

        for candidate in candidates {
            let content_type = candidate.effective_content_type();
            if !self.policy.accepts_type(&content_type) {
                rejected.push(Rejection::InvalidType {
                    name: candidate.name,
                    content_type,
                });
            } else if candidate.size() > self.policy.max_file_size {
                rejected.push(Rejection::TooLarge {
                    size: candidate.size(),
                    name: candidate.name,
                    max: self.policy.max_file_size,
                });
            } else if slots == 0 {
                rejected.push(Rejection::TooMany {
                    name: candidate.name,
                    max: self.policy.max_files,
                });
            } else {
                slots -= 1;
                accepted.push(candidate);
            }
        }

        IntakeReport { accepted, rejected }
    }

    /// Admit a drop: refuse it on the first type or size failure, otherwise
    /// turn the accepted candidates into selected files with image previews.
    pub async fn admit(
        &self,
        candidates: Vec<CandidateFile>,
        already_selected: usize,
        store: &dyn BlobStore,
    ) -> Result<Admission, ConvertError> {
        let submitted = already_selected + candidates.len();
        let report = self.partition(candidates, already_selected);

        if let Some(rejection) = report.first_blocking() {
            tracing::debug!(file = %rejection.name(), reason = ?rejection, "Selection refused");
            return Err(rejection.clone().into_error(&self.policy, submitted));
        }

        let truncated = report
            .rejected
            .into_iter()
            .next()
            .map(|r| r.into_error(&self.policy, submitted));

        let mut files = Vec::with_capacity(report.accepted.len());
        for candidate in report.accepted {
            let content_type = candidate.effective_content_type();
            let preview = if content_type.starts_with("image/") {
                match store.put(candidate.data.clone()).await {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        release_previews(&files, store).await;
                        return Err(e.into());
                    }
                }
            } else {
                None
            };

            files.push(SelectedFile {
                id: Uuid::new_v4(),
                size: candidate.size(),
                name: candidate.name,
                content_type,
                data: candidate.data,
                preview,
            });
        }

        tracing::debug!(
            accepted = files.len(),
            truncated = truncated.is_some(),
            "Selection admitted"
        );

        Ok(Admission { files, truncated })
    }
}

/// Release the preview handles of `files`. Failures are logged, not returned.
pub async fn release_previews(files: &[SelectedFile], store: &dyn BlobStore) {
    for file in files {
        if let Some(handle) = &file.preview {
            if let Err(e) = store.revoke(handle).await {
                tracing::warn!(file = %file.name, error = %e, "Failed to release preview");
            }
        }
    }
}
