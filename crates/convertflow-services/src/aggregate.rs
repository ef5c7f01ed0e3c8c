//! Result aggregation and user-facing summaries.

use convertflow_core::constants::{
    ALL_FAILED_MESSAGE, SINGLE_FAILURE_MESSAGE, SINGLE_SUCCESS_MESSAGE,
};
use convertflow_core::models::{BatchOutcome, ConversionResult, FailedItem};
use convertflow_core::{ConvertError, ErrorMetadata};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Warning,
    Error,
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }

    /// Notification for an error, using its client-facing message.
    pub fn from_error(err: &ConvertError) -> Self {
        Self::error(err.client_message())
    }
}

/// Accumulates per-item outcomes while a run is in progress.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    results: Vec<ConversionResult>,
    failed: Vec<FailedItem>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, result: ConversionResult) {
        self.results.push(result);
    }

    pub fn record_failure(&mut self, source_name: &str, err: &ConvertError) {
        self.failed.push(FailedItem {
            source_name: source_name.to_string(),
            message: err.client_message(),
        });
    }

    pub fn recorded(&self) -> usize {
        self.results.len() + self.failed.len()
    }

    pub fn finish(self) -> BatchOutcome {
        BatchOutcome::new(self.results, self.failed)
    }
}

fn files(count: usize) -> String {
    if count == 1 {
        "1 file".to_string()
    } else {
        format!("{} files", count)
    }
}

/// The single summary notification for a completed run.
///
/// A run over exactly one file reads as a single conversion, whichever
/// selection mode produced it.
pub fn summarize(outcome: &BatchOutcome, past_tense: &str) -> Notification {
    let (ok, failed) = (outcome.successes(), outcome.failures());

    if outcome.submitted() == 1 {
        return if ok == 1 {
            Notification::success(SINGLE_SUCCESS_MESSAGE)
        } else {
            Notification::error(
                outcome
                    .failed()
                    .first()
                    .map(|f| f.message.clone())
                    .unwrap_or_else(|| SINGLE_FAILURE_MESSAGE.to_string()),
            )
        };
    }

    match (ok, failed) {
        (0, _) => Notification::error(ALL_FAILED_MESSAGE),
        (ok, 0) => Notification::success(format!("{} {} successfully", files(ok), past_tense)),
        (ok, failed) => Notification::warning(format!(
            "{} {} successfully, {} failed",
            files(ok),
            past_tense,
            failed
        )),
    }
}
