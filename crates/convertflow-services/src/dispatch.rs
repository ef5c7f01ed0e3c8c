//! Conversion request dispatcher
//!
//! Per-file tools get one request per file, strictly one after another: file
//! `i + 1` is not sent until file `i` has answered. A failed item is recorded
//! and the loop moves on. Combined tools send every file in one request.

use std::sync::Arc;

use convertflow_api_client::ConversionEndpoint;
use convertflow_core::filename::combined_filename;
use convertflow_core::models::{
    content_type_for_filename, BatchOutcome, ConversionParameters, ConversionResult,
    DispatchStrategy, ParamKey, SelectedFile, ToolSpec, UpscaleFactor,
};
use convertflow_core::{ConvertError, ErrorMetadata};
use convertflow_storage::BlobStore;

use crate::aggregate::ResultAggregator;

#[derive(Clone)]
pub struct Dispatcher {
    endpoint: Arc<dyn ConversionEndpoint>,
    store: Arc<dyn BlobStore>,
}

impl Dispatcher {
    pub fn new(endpoint: Arc<dyn ConversionEndpoint>, store: Arc<dyn BlobStore>) -> Self {
        Self { endpoint, store }
    }

    /// Reject a run that cannot start: no files, a report tool, parameters
    /// the tool refuses, or too few files for a combining tool. Makes no
    /// request and touches no state.
    pub fn preflight(
        &self,
        tool: &ToolSpec,
        files: &[SelectedFile],
        params: &ConversionParameters,
    ) -> Result<(), ConvertError> {
        if files.is_empty() {
            return Err(ConvertError::NoFilesSelected);
        }
        if tool.is_report() {
            return Err(ConvertError::UnsupportedOperation(format!(
                "{} returns a report and cannot be converted; use inspect instead",
                tool.slug
            )));
        }
        params.check_against(tool)?;

        if let DispatchStrategy::Combined { min_files, .. } = &tool.dispatch {
            if files.len() < *min_files {
                return Err(ConvertError::InvalidParameter(format!(
                    "Please select at least {} files",
                    min_files
                )));
            }
        }
        Ok(())
    }

    /// Run a conversion over `files` in order.
    ///
    /// Everything [`preflight`](Self::preflight) rejects is returned before
    /// any request is made. Per-item request failures never abort the run;
    /// they are counted in the returned outcome.
    #[tracing::instrument(skip(self, tool, files, params), fields(
        tool = %tool.slug,
        file_count = files.len()
    ))]
    pub async fn run(
        &self,
        tool: &ToolSpec,
        files: &[SelectedFile],
        params: &ConversionParameters,
    ) -> Result<BatchOutcome, ConvertError> {
        self.preflight(tool, files, params)?;

        match &tool.dispatch {
            DispatchStrategy::PerFile => Ok(self.run_per_file(tool, files, params).await),
            DispatchStrategy::Combined {
                output_prefix,
                output_extension,
                ..
            } => {
                let filename = combined_filename(
                    output_prefix,
                    output_extension,
                    chrono::Utc::now().timestamp_millis(),
                );
                self.run_combined(tool, files, params, filename).await
            }
        }
    }

    async fn run_per_file(
        &self,
        tool: &ToolSpec,
        files: &[SelectedFile],
        params: &ConversionParameters,
    ) -> BatchOutcome {
        let factor = factor_digits(tool, params);
        let mut aggregator = ResultAggregator::new();

        for (index, file) in files.iter().enumerate() {
            match self.convert_one(tool, file, params, factor).await {
                Ok(result) => {
                    tracing::info!(
                        index,
                        file = %file.name,
                        output = %result.filename,
                        bytes = result.size,
                        "File converted"
                    );
                    aggregator.record_success(result);
                }
                Err(e) => {
                    tracing::warn!(
                        index,
                        file = %file.name,
                        error_code = e.error_code(),
                        error = %e,
                        "File conversion failed"
                    );
                    aggregator.record_failure(&file.name, &e);
                }
            }
        }

        let outcome = aggregator.finish();
        tracing::info!(
            successes = outcome.successes(),
            failures = outcome.failures(),
            "Conversion run finished"
        );
        outcome
    }

    async fn convert_one(
        &self,
        tool: &ToolSpec,
        file: &SelectedFile,
        params: &ConversionParameters,
        factor: Option<&str>,
    ) -> Result<ConversionResult, ConvertError> {
        let payload = self.endpoint.convert(tool, file, params).await?;
        let filename = tool.filename_rule.derive(&file.name, factor);
        let size = payload.data.len() as u64;
        let blob = self.store.put(payload.data).await?;

        Ok(ConversionResult {
            blob,
            content_type: payload
                .content_type
                .or_else(|| content_type_for_filename(&filename).map(str::to_string)),
            filename,
            size,
            source_name: file.name.clone(),
        })
    }

    async fn run_combined(
        &self,
        tool: &ToolSpec,
        files: &[SelectedFile],
        params: &ConversionParameters,
        filename: String,
    ) -> Result<BatchOutcome, ConvertError> {
        let payload = self
            .endpoint
            .convert_combined(tool, files, params)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Combined request failed");
                ConvertError::from(e)
            })?;

        let size = payload.data.len() as u64;
        let blob = self.store.put(payload.data).await?;
        let source_name = files
            .iter()
            .map(|f| f.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        tracing::info!(output = %filename, bytes = size, "Files combined");

        let mut aggregator = ResultAggregator::new();
        aggregator.record_success(ConversionResult {
            blob,
            content_type: payload
                .content_type
                .or_else(|| content_type_for_filename(&filename).map(str::to_string)),
            filename,
            size,
            source_name,
        });
        Ok(aggregator.finish())
    }
}

/// Upscale factor digits for filename rules: the chosen factor, else the
/// tool's declared default.
fn factor_digits(tool: &ToolSpec, params: &ConversionParameters) -> Option<&'static str> {
    params
        .upscale_factor
        .or_else(|| {
            tool.params
                .iter()
                .find(|b| b.key == ParamKey::UpscaleFactor)
                .and_then(|b| b.default.as_ref())
                .and_then(|v| v.as_str())
                .and_then(|s| s.parse::<UpscaleFactor>().ok())
        })
        .map(|f| f.digits())
}
