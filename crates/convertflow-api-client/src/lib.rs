//! HTTP client for the remote conversion endpoints.
//!
//! Provides a minimal client with optional `X-API-Key` auth, the payload
//! encoders for each tool encoding, and the [`ConversionEndpoint`] trait the
//! dispatcher is generic over.

pub mod api;
pub mod encoding;
pub mod error;

use std::time::Duration;

use anyhow::{Context, Result};
use bytes::Bytes;
use convertflow_core::ClientConfig;
use reqwest::{Client, Response};

pub use api::{BackgroundScan, ConversionEndpoint, ConvertedPayload};
pub use error::{ClientError, ClientResult};

use error::extract_error_detail;

/// HTTP client for the conversion API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ApiClient {
    /// `timeout: None` leaves requests unbounded.
    pub fn new(base_url: String, api_key: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(
            config.api_url.clone(),
            config.api_key.clone(),
            config.request_timeout,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("X-API-Key", key.as_str()),
            None => request,
        }
    }

    /// POST a multipart form and return the raw body.
    pub async fn post_multipart(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> ClientResult<ConvertedPayload> {
        let request = self.client.post(self.build_url(path)).multipart(form);
        let response = self.apply_auth(request).send().await?;
        Self::read_body(response).await
    }

    /// POST a JSON body and return the raw body.
    pub async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> ClientResult<ConvertedPayload> {
        let request = self.client.post(self.build_url(path)).json(body);
        let response = self.apply_auth(request).send().await?;
        Self::read_body(response).await
    }

    async fn read_body(response: Response) -> ClientResult<ConvertedPayload> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let detail = extract_error_detail(&error_text);
            return Err(ClientError::Status {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("Unknown status")
                    .to_string(),
                detail,
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let data: Bytes = response.bytes().await?;

        Ok(ConvertedPayload { data, content_type })
    }

    /// Raw client for custom requests. Caller must apply auth.
    pub fn client(&self) -> &Client {
        &self.client
    }
}
