//! Conversion calls against the remote tool endpoints.

use async_trait::async_trait;
use bytes::Bytes;
use convertflow_core::models::{ConversionParameters, PayloadEncoding, SelectedFile, ToolSpec};
use serde::{Deserialize, Serialize};

use crate::encoding::{combined_form, json_body, multipart_form};
use crate::error::{ClientError, ClientResult};
use crate::ApiClient;

/// Body of a successful conversion response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedPayload {
    pub data: Bytes,
    pub content_type: Option<String>,
}

/// Report returned by the transparent-background preview endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundScan {
    pub background_percentage: u32,
    /// `High`, `Medium` or `Low`
    pub confidence: String,
    pub detected: bool,
    /// Data URL of the scanning preview image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

/// A remote conversion endpoint. One call is one request.
#[async_trait]
pub trait ConversionEndpoint: Send + Sync {
    /// Convert one file.
    async fn convert(
        &self,
        tool: &ToolSpec,
        file: &SelectedFile,
        params: &ConversionParameters,
    ) -> ClientResult<ConvertedPayload>;

    /// Send every file in a single request and receive one output.
    async fn convert_combined(
        &self,
        tool: &ToolSpec,
        files: &[SelectedFile],
        params: &ConversionParameters,
    ) -> ClientResult<ConvertedPayload>;
}

impl ApiClient {
    async fn send_single(
        &self,
        tool: &ToolSpec,
        file: &SelectedFile,
        params: &ConversionParameters,
    ) -> ClientResult<ConvertedPayload> {
        let fields = params.wire_fields(&tool.params);
        let start = std::time::Instant::now();

        let result = match &tool.encoding {
            PayloadEncoding::Multipart { file_field } => {
                let form = multipart_form(file, file_field, &fields)?;
                self.post_multipart(&tool.endpoint, form).await
            }
            PayloadEncoding::JsonBase64 { file_field } => {
                let body = json_body(file, file_field, &fields);
                self.post_json(&tool.endpoint, &body).await
            }
        };

        match &result {
            Ok(payload) => tracing::debug!(
                tool = %tool.slug,
                file = %file.name,
                bytes = payload.data.len(),
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Conversion request succeeded"
            ),
            Err(e) => tracing::debug!(
                tool = %tool.slug,
                file = %file.name,
                status = ?e.status(),
                error = %e,
                "Conversion request failed"
            ),
        }

        result
    }

    /// Call a report endpoint and return its JSON body.
    pub async fn inspect(
        &self,
        tool: &ToolSpec,
        file: &SelectedFile,
        params: &ConversionParameters,
    ) -> ClientResult<serde_json::Value> {
        if !tool.is_report() {
            return Err(ClientError::InvalidResponse(format!(
                "{} does not return a report",
                tool.slug
            )));
        }

        let payload = self.send_single(tool, file, params).await?;
        serde_json::from_slice(&payload.data)
            .map_err(|e| ClientError::InvalidResponse(format!("Report is not valid JSON: {}", e)))
    }

    /// Background detection report for one image.
    pub async fn scan_background(
        &self,
        tool: &ToolSpec,
        file: &SelectedFile,
    ) -> ClientResult<BackgroundScan> {
        let report = self
            .inspect(tool, file, &ConversionParameters::default())
            .await?;
        serde_json::from_value(report)
            .map_err(|e| ClientError::InvalidResponse(format!("Unexpected report shape: {}", e)))
    }
}

#[async_trait]
impl ConversionEndpoint for ApiClient {
    async fn convert(
        &self,
        tool: &ToolSpec,
        file: &SelectedFile,
        params: &ConversionParameters,
    ) -> ClientResult<ConvertedPayload> {
        self.send_single(tool, file, params).await
    }

    async fn convert_combined(
        &self,
        tool: &ToolSpec,
        files: &[SelectedFile],
        params: &ConversionParameters,
    ) -> ClientResult<ConvertedPayload> {
        let file_field = match &tool.encoding {
            PayloadEncoding::Multipart { file_field } => file_field,
            PayloadEncoding::JsonBase64 { .. } => {
                return Err(ClientError::Encoding(format!(
                    "{} combines files but is not multipart",
                    tool.slug
                )))
            }
        };

        let fields = params.wire_fields(&tool.params);
        let form = combined_form(files, file_field, &fields)?;
        tracing::debug!(tool = %tool.slug, file_count = files.len(), "Sending combined request");
        self.post_multipart(&tool.endpoint, form).await
    }
}
