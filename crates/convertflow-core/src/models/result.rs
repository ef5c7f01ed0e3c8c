use serde::Serialize;

use crate::BlobHandle;

/// Output of one successful remote call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionResult {
    /// Transient handle to the converted bytes
    pub blob: BlobHandle,
    /// Derived output filename
    pub filename: String,
    pub size: u64,
    pub content_type: Option<String>,
    /// Name of the originating selected file
    pub source_name: String,
}

/// A file whose request failed, with the text reported for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedItem {
    pub source_name: String,
    pub message: String,
}

/// Aggregate over one run: successful results in submission order plus the
/// failed items. Built once when the run completes and never updated after.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    results: Vec<ConversionResult>,
    failed: Vec<FailedItem>,
}

impl BatchOutcome {
    pub fn new(results: Vec<ConversionResult>, failed: Vec<FailedItem>) -> Self {
        Self { results, failed }
    }

    pub fn results(&self) -> &[ConversionResult] {
        &self.results
    }

    pub fn failed(&self) -> &[FailedItem] {
        &self.failed
    }

    pub fn successes(&self) -> usize {
        self.results.len()
    }

    pub fn failures(&self) -> usize {
        self.failed.len()
    }

    /// Number of files that went into the run.
    pub fn submitted(&self) -> usize {
        self.successes() + self.failures()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Whether a "download all" archive is offered (more than one result).
    pub fn offers_archive(&self) -> bool {
        self.results.len() > 1
    }

    pub fn into_results(self) -> Vec<ConversionResult> {
        self.results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str) -> ConversionResult {
        ConversionResult {
            blob: BlobHandle::new(),
            filename: name.to_string(),
            size: 3,
            content_type: Some("image/png".to_string()),
            source_name: name.to_string(),
        }
    }

    #[test]
    fn test_counts_cover_every_submitted_file() {
        let outcome = BatchOutcome::new(
            vec![result("a.png"), result("b.png")],
            vec![FailedItem {
                source_name: "c.png".to_string(),
                message: "boom".to_string(),
            }],
        );
        assert_eq!(outcome.successes(), 2);
        assert_eq!(outcome.failures(), 1);
        assert_eq!(outcome.submitted(), 3);
        assert!(outcome.offers_archive());
    }

    #[test]
    fn test_single_result_has_no_archive() {
        let outcome = BatchOutcome::new(vec![result("a.png")], Vec::new());
        assert!(!outcome.offers_archive());
        assert!(!outcome.is_empty());
        assert!(BatchOutcome::default().is_empty());
    }
}
