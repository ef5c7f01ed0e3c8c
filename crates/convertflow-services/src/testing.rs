//! Test doubles shared by the service tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use convertflow_api_client::{ClientError, ClientResult, ConversionEndpoint, ConvertedPayload};
use convertflow_core::models::{ConversionParameters, SelectedFile, ToolSpec};
use convertflow_core::{BlobBackend, BlobHandle};
use convertflow_storage::{BlobStore, MemoryBlobStore, StorageError, StorageResult};
use uuid::Uuid;

pub fn selected(name: &str, content_type: &str) -> SelectedFile {
    let data = Bytes::from(format!("input:{}", name));
    SelectedFile {
        id: Uuid::new_v4(),
        size: data.len() as u64,
        name: name.to_string(),
        content_type: content_type.to_string(),
        data,
        preview: None,
    }
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub file: String,
    pub started: Instant,
    pub finished: Instant,
}

/// Endpoint that answers `converted:<name>` after an optional delay and fails
/// for the configured file names with a 500.
#[derive(Default)]
pub struct ScriptedEndpoint {
    failing: HashSet<String>,
    latency: Duration,
    calls: Mutex<Vec<RecordedCall>>,
    combined: AtomicUsize,
}

impl ScriptedEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(names: &[&str]) -> Self {
        Self {
            failing: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn combined_calls(&self) -> usize {
        self.combined.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConversionEndpoint for ScriptedEndpoint {
    async fn convert(
        &self,
        _tool: &ToolSpec,
        file: &SelectedFile,
        _params: &ConversionParameters,
    ) -> ClientResult<ConvertedPayload> {
        let started = Instant::now();
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let finished = Instant::now();
        self.calls.lock().unwrap().push(RecordedCall {
            file: file.name.clone(),
            started,
            finished,
        });

        if self.failing.contains(&file.name) {
            return Err(ClientError::Status {
                status: 500,
                message: "Internal Server Error".to_string(),
                detail: Some("Conversion failed".to_string()),
            });
        }

        Ok(ConvertedPayload {
            data: Bytes::from(format!("converted:{}", file.name)),
            content_type: None,
        })
    }

    async fn convert_combined(
        &self,
        _tool: &ToolSpec,
        files: &[SelectedFile],
        _params: &ConversionParameters,
    ) -> ClientResult<ConvertedPayload> {
        self.combined.fetch_add(1, Ordering::SeqCst);
        Ok(ConvertedPayload {
            data: Bytes::from(format!("combined:{}", files.len())),
            content_type: Some("application/pdf".to_string()),
        })
    }
}

/// Memory store whose `fetch` can be made to fail for chosen handles and
/// which tracks how many fetches were in flight at once.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryBlobStore,
    broken: Mutex<HashSet<BlobHandle>>,
    fetch_delay: Duration,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    pub fn break_handle(&self, handle: BlobHandle) {
        self.broken.lock().unwrap().insert(handle);
    }

    pub fn repair_all(&self) {
        self.broken.lock().unwrap().clear();
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for FlakyStore {
    async fn put(&self, data: Bytes) -> StorageResult<BlobHandle> {
        self.inner.put(data).await
    }

    async fn fetch(&self, handle: &BlobHandle) -> StorageResult<Bytes> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.broken.lock().unwrap().contains(handle) {
            return Err(StorageError::ReadFailed("simulated network drop".to_string()));
        }
        self.inner.fetch(handle).await
    }

    async fn revoke(&self, handle: &BlobHandle) -> StorageResult<()> {
        self.inner.revoke(handle).await
    }

    async fn contains(&self, handle: &BlobHandle) -> StorageResult<bool> {
        self.inner.contains(handle).await
    }

    async fn live_count(&self) -> StorageResult<usize> {
        self.inner.live_count().await
    }

    fn backend_type(&self) -> BlobBackend {
        BlobBackend::Memory
    }
}
