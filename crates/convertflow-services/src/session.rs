//! Per-session conversion workbench
//!
//! Owns one tool's selection, the last run's outcome and the state machine
//! `Idle → FilesSelected → Converting → (Converted | PartiallyConverted | Failed)`.
//! A new selection or a clear returns to `FilesSelected`/`Idle`. While
//! `Converting`, every mutating call is refused with [`ConvertError::Busy`].

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use convertflow_api_client::ConversionEndpoint;
use convertflow_core::constants::ARCHIVE_SUCCESS_MESSAGE;
use convertflow_core::models::{
    BatchOutcome, CandidateFile, ConversionParameters, ConversionResult, SelectedFile, ToolSpec,
};
use convertflow_core::{ConvertError, ErrorMetadata};
use convertflow_storage::BlobStore;
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::aggregate::{summarize, Notification};
use crate::archive::ArchivePackager;
use crate::dispatch::Dispatcher;
use crate::download::DownloadTrigger;
use crate::intake::{release_previews, FileIntake, IntakePolicy, SelectionMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkbenchState {
    Idle,
    FilesSelected,
    Converting,
    Converted,
    PartiallyConverted,
    Failed,
}

impl WorkbenchState {
    fn after(outcome: &BatchOutcome) -> Self {
        match (outcome.successes(), outcome.failures()) {
            (0, _) => WorkbenchState::Failed,
            (_, 0) => WorkbenchState::Converted,
            _ => WorkbenchState::PartiallyConverted,
        }
    }
}

/// Clears the in-flight flag when dropped, so a run whose future is dropped
/// part way leaves the session usable.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct Inner {
    /// State outside of a run. `Converting` is reported from the in-flight flag.
    state: WorkbenchState,
    mode: SelectionMode,
    selected: Vec<SelectedFile>,
    outcome: BatchOutcome,
}

pub struct Workbench {
    tool: ToolSpec,
    store: Arc<dyn BlobStore>,
    dispatcher: Dispatcher,
    packager: ArchivePackager,
    trigger: DownloadTrigger,
    converting: AtomicBool,
    inner: Mutex<Inner>,
}

impl Workbench {
    pub fn new(
        tool: ToolSpec,
        endpoint: Arc<dyn ConversionEndpoint>,
        store: Arc<dyn BlobStore>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            dispatcher: Dispatcher::new(endpoint, store.clone()),
            packager: ArchivePackager::new(store.clone()),
            trigger: DownloadTrigger::new(store.clone(), output_dir),
            store,
            tool,
            converting: AtomicBool::new(false),
            inner: Mutex::new(Inner {
                state: WorkbenchState::Idle,
                mode: SelectionMode::Single,
                selected: Vec::new(),
                outcome: BatchOutcome::default(),
            }),
        }
    }

    pub fn tool(&self) -> &ToolSpec {
        &self.tool
    }

    pub async fn state(&self) -> WorkbenchState {
        let inner = self.inner.lock().await;
        if self.converting.load(Ordering::SeqCst) {
            WorkbenchState::Converting
        } else {
            inner.state
        }
    }

    pub async fn mode(&self) -> SelectionMode {
        self.inner.lock().await.mode
    }

    pub async fn selected(&self) -> Vec<SelectedFile> {
        self.inner.lock().await.selected.clone()
    }

    pub async fn outcome(&self) -> BatchOutcome {
        self.inner.lock().await.outcome.clone()
    }

    /// Whether the "download all" action is offered.
    pub async fn offers_archive(&self) -> bool {
        self.inner.lock().await.outcome.offers_archive()
    }

    fn ensure_idle(&self) -> Result<(), ConvertError> {
        if self.converting.load(Ordering::SeqCst) {
            return Err(ConvertError::Busy);
        }
        Ok(())
    }

    /// Release previews and results and empty the selection.
    async fn discard(&self, inner: &mut Inner) {
        release_previews(&inner.selected, self.store.as_ref()).await;
        inner.selected.clear();
        self.discard_results(inner).await;
    }

    async fn discard_results(&self, inner: &mut Inner) {
        for result in std::mem::take(&mut inner.outcome).into_results() {
            if let Err(e) = self.store.revoke(&result.blob).await {
                tracing::warn!(file = %result.filename, error = %e, "Failed to release result");
            }
        }
    }

    /// Switch between single and batch selection. Clears the selection.
    pub async fn set_mode(&self, mode: SelectionMode) -> Result<(), ConvertError> {
        let mut inner = self.inner.lock().await;
        self.ensure_idle()?;
        if inner.mode != mode {
            self.discard(&mut inner).await;
            inner.mode = mode;
            inner.state = WorkbenchState::Idle;
            tracing::debug!(tool = %self.tool.slug, mode = %mode, "Selection mode changed");
        }
        Ok(())
    }

    /// Offer candidate files. Single mode replaces the selection, batch mode
    /// appends up to the tool's limit. Returns a warning when files were
    /// dropped for exceeding the limit.
    pub async fn select(
        &self,
        candidates: Vec<CandidateFile>,
    ) -> Result<Option<Notification>, ConvertError> {
        let mut inner = self.inner.lock().await;
        self.ensure_idle()?;

        let intake = FileIntake::new(IntakePolicy::for_tool(&self.tool, inner.mode));
        let keep_existing = inner.mode == SelectionMode::Batch;
        let already = if keep_existing { inner.selected.len() } else { 0 };

        let admission = intake
            .admit(candidates, already, self.store.as_ref())
            .await
            .inspect_err(|e| {
                tracing::debug!(tool = %self.tool.slug, error_code = e.error_code(), "Selection rejected")
            })?;

        if !keep_existing {
            release_previews(&inner.selected, self.store.as_ref()).await;
            inner.selected.clear();
        }
        self.discard_results(&mut inner).await;
        inner.selected.extend(admission.files);
        inner.state = if inner.selected.is_empty() {
            WorkbenchState::Idle
        } else {
            WorkbenchState::FilesSelected
        };

        Ok(admission
            .truncated
            .map(|e| Notification::warning(e.client_message())))
    }

    /// Remove one selected file by id.
    pub async fn remove(&self, id: Uuid) -> Result<bool, ConvertError> {
        let mut inner = self.inner.lock().await;
        self.ensure_idle()?;

        let Some(pos) = inner.selected.iter().position(|f| f.id == id) else {
            return Ok(false);
        };
        let removed = inner.selected.remove(pos);
        release_previews(std::slice::from_ref(&removed), self.store.as_ref()).await;
        if inner.selected.is_empty() {
            self.discard_results(&mut inner).await;
            inner.state = WorkbenchState::Idle;
        }
        Ok(true)
    }

    /// Drop the selection and any results and return to `Idle`.
    pub async fn clear(&self) -> Result<(), ConvertError> {
        let mut inner = self.inner.lock().await;
        self.ensure_idle()?;
        self.discard(&mut inner).await;
        inner.state = WorkbenchState::Idle;
        Ok(())
    }

    /// Run the conversion over the current selection and return the summary.
    ///
    /// Anything the dispatcher rejects up front (no files, bad parameters,
    /// too few files to combine) leaves the state and the previous outcome
    /// untouched. Otherwise the previous outcome is replaced wholesale. If
    /// the returned future is dropped mid-run the session falls back to
    /// `FilesSelected`.
    pub async fn convert(&self, params: &ConversionParameters) -> Result<Notification, ConvertError> {
        let (files, mode, in_flight) = {
            let mut inner = self.inner.lock().await;
            self.ensure_idle()?;
            self.dispatcher.preflight(&self.tool, &inner.selected, params)?;
            self.discard_results(&mut inner).await;
            inner.state = WorkbenchState::FilesSelected;
            self.converting.store(true, Ordering::SeqCst);
            (
                inner.selected.clone(),
                inner.mode,
                InFlight(&self.converting),
            )
        };

        // the lock is not held while requests are in flight
        let run = self.dispatcher.run(&self.tool, &files, params).await;

        let mut inner = self.inner.lock().await;
        let result = match run {
            Ok(outcome) => {
                let note = summarize(&outcome, &self.tool.past_tense);
                inner.state = WorkbenchState::after(&outcome);
                inner.outcome = outcome;
                tracing::debug!(tool = %self.tool.slug, mode = %mode, state = ?inner.state, "Run finished");
                Ok(note)
            }
            Err(e) => {
                inner.state = WorkbenchState::Failed;
                Err(e)
            }
        };
        drop(in_flight);
        result
    }

    /// Write one result to the output directory. The result stays available.
    pub async fn download(&self, index: usize) -> Result<PathBuf, ConvertError> {
        let result: ConversionResult = {
            let inner = self.inner.lock().await;
            inner.outcome.results().get(index).cloned().ok_or_else(|| {
                ConvertError::InvalidParameter(format!("No result at position {}", index + 1))
            })?
        };
        self.trigger.download(&result.blob, &result.filename).await
    }

    /// Write every result to the output directory.
    pub async fn download_each(&self) -> Result<Vec<PathBuf>, ConvertError> {
        let results = self.outcome().await.into_results();
        let mut paths = Vec::with_capacity(results.len());
        for result in &results {
            paths.push(self.trigger.download(&result.blob, &result.filename).await?);
        }
        Ok(paths)
    }

    /// Package all results into the tool's archive and write it.
    pub async fn download_all(&self) -> Result<(PathBuf, Notification), ConvertError> {
        let results = {
            let inner = self.inner.lock().await;
            self.ensure_idle()?;
            inner.outcome.results().to_vec()
        };

        match self
            .packager
            .package(&results, &self.tool.archive_name, &self.trigger)
            .await
        {
            Ok(path) => Ok((path, Notification::success(ARCHIVE_SUCCESS_MESSAGE))),
            Err(e) => {
                tracing::warn!(tool = %self.tool.slug, error = %e, "Archive download failed");
                Err(e)
            }
        }
    }

    /// Release every preview and result held by this session.
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        self.discard(&mut inner).await;
        inner.state = WorkbenchState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::NotificationLevel;
    use crate::testing::{FlakyStore, ScriptedEndpoint};
    use convertflow_core::{ErrorClass, ToolCatalog};
    use convertflow_storage::MemoryBlobStore;
    use std::time::Duration;

    fn tool(slug: &str) -> ToolSpec {
        ToolCatalog::builtin().get(slug).unwrap().clone()
    }

    fn jpg(name: &str) -> CandidateFile {
        CandidateFile::new(name, Some("image/jpeg".to_string()), b"jpeg".to_vec())
    }

    fn avif(name: &str) -> CandidateFile {
        CandidateFile::new(name, None, b"avif".to_vec())
    }

    #[tokio::test]
    async fn test_single_valid_file_converts_without_archive() {
        let dir = tempfile::tempdir().unwrap();
        let endpoint = Arc::new(ScriptedEndpoint::new());
        let bench = Workbench::new(
            tool("remove-background"),
            endpoint.clone(),
            Arc::new(MemoryBlobStore::new()),
            dir.path(),
        );

        bench.select(vec![jpg("cat.jpg")]).await.unwrap();
        assert_eq!(bench.state().await, WorkbenchState::FilesSelected);

        let note = bench.convert(&ConversionParameters::default()).await.unwrap();
        assert_eq!(note.message, "Conversion completed successfully!");
        assert_eq!(endpoint.calls().len(), 1);
        assert_eq!(bench.state().await, WorkbenchState::Converted);
        assert_eq!(bench.outcome().await.results().len(), 1);
        assert!(!bench.offers_archive().await);

        let path = bench.download(0).await.unwrap();
        assert_eq!(path, dir.path().join("cat_no_bg.png"));
    }

    #[tokio::test]
    async fn test_batch_with_one_failure() {
        let dir = tempfile::tempdir().unwrap();
        let endpoint = Arc::new(ScriptedEndpoint::failing_on(&["two.avif"]));
        let bench = Workbench::new(
            tool("avif-to-jpg"),
            endpoint.clone(),
            Arc::new(MemoryBlobStore::new()),
            dir.path(),
        );
        bench.set_mode(SelectionMode::Batch).await.unwrap();
        bench
            .select(vec![avif("one.avif"), avif("two.avif"), avif("three.avif")])
            .await
            .unwrap();

        let note = bench.convert(&ConversionParameters::default()).await.unwrap();
        assert_eq!(note.message, "2 files converted successfully, 1 failed");
        assert_eq!(note.level, NotificationLevel::Warning);
        assert_eq!(endpoint.calls().len(), 3);
        assert_eq!(bench.state().await, WorkbenchState::PartiallyConverted);
        assert_eq!(bench.outcome().await.results().len(), 2);
        assert!(bench.offers_archive().await);

        let (path, note) = bench.download_all().await.unwrap();
        assert_eq!(path, dir.path().join("imageoptimizer.in.zip"));
        assert_eq!(note.message, "ZIP file downloaded successfully!");
    }

    #[tokio::test]
    async fn test_oversized_file_is_rejected_before_any_request() {
        let endpoint = Arc::new(ScriptedEndpoint::new());
        let mut spec = tool("avif-to-jpg");
        spec.max_file_size = 8;
        let bench = Workbench::new(
            spec,
            endpoint.clone(),
            Arc::new(MemoryBlobStore::new()),
            ".",
        );

        let err = bench
            .select(vec![CandidateFile::new("big.avif", None, vec![0u8; 9])])
            .await
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::Selection);
        assert_eq!(err.client_message(), "File size must be less than 8 Bytes");
        assert_eq!(bench.state().await, WorkbenchState::Idle);
        assert!(endpoint.calls().is_empty());
    }

    #[tokio::test]
    async fn test_archive_failure_keeps_individual_results() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FlakyStore::new());
        let bench = Workbench::new(
            tool("avif-to-jpg"),
            Arc::new(ScriptedEndpoint::new()),
            store.clone(),
            dir.path(),
        );
        bench.set_mode(SelectionMode::Batch).await.unwrap();
        bench.select(vec![avif("a.avif"), avif("b.avif")]).await.unwrap();
        bench.convert(&ConversionParameters::default()).await.unwrap();

        let outcome = bench.outcome().await;
        store.break_handle(outcome.results()[1].blob);

        let err = bench.download_all().await.unwrap_err();
        assert_eq!(err.client_message(), "Failed to create ZIP file. Please try again.");
        assert!(!dir.path().join("imageoptimizer.in.zip").exists());

        store.repair_all();
        assert_eq!(bench.download(0).await.unwrap(), dir.path().join("a.jpg"));
        assert_eq!(bench.download(1).await.unwrap(), dir.path().join("b.jpg"));
        assert_eq!(bench.state().await, WorkbenchState::Converted);
    }

    #[tokio::test]
    async fn test_double_submit_is_refused() {
        let endpoint = Arc::new(ScriptedEndpoint::new().with_latency(Duration::from_millis(100)));
        let bench = Arc::new(Workbench::new(
            tool("avif-to-jpg"),
            endpoint.clone(),
            Arc::new(MemoryBlobStore::new()),
            ".",
        ));
        bench.select(vec![avif("a.avif")]).await.unwrap();

        let running = {
            let bench = bench.clone();
            tokio::spawn(async move { bench.convert(&ConversionParameters::default()).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(bench.state().await, WorkbenchState::Converting);

        let second = bench.convert(&ConversionParameters::default()).await;
        assert!(matches!(second, Err(ConvertError::Busy)));
        assert!(matches!(bench.select(vec![avif("b.avif")]).await, Err(ConvertError::Busy)));

        running.await.unwrap().unwrap();
        assert_eq!(endpoint.calls().len(), 1);
        assert_eq!(bench.state().await, WorkbenchState::Converted);
    }

    #[tokio::test]
    async fn test_mode_switch_clears_selection_and_previews() {
        let store = Arc::new(MemoryBlobStore::new());
        let bench = Workbench::new(
            tool("remove-background"),
            Arc::new(ScriptedEndpoint::new()),
            store.clone(),
            ".",
        );
        bench.select(vec![jpg("a.jpg")]).await.unwrap();
        assert_eq!(store.live_count().await.unwrap(), 1);

        bench.set_mode(SelectionMode::Batch).await.unwrap();
        assert!(bench.selected().await.is_empty());
        assert_eq!(bench.state().await, WorkbenchState::Idle);
        assert_eq!(store.live_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_batch_appends_and_truncates() {
        let mut spec = tool("avif-to-jpg");
        spec.max_files = 3;
        let bench = Workbench::new(
            spec,
            Arc::new(ScriptedEndpoint::new()),
            Arc::new(MemoryBlobStore::new()),
            ".",
        );
        bench.set_mode(SelectionMode::Batch).await.unwrap();

        assert!(bench.select(vec![avif("a.avif"), avif("b.avif")]).await.unwrap().is_none());
        let warning = bench
            .select(vec![avif("c.avif"), avif("d.avif")])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(warning.level, NotificationLevel::Warning);
        assert_eq!(warning.message, "Too many files. You can select up to 3 files");

        let names: Vec<String> = bench.selected().await.into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["a.avif", "b.avif", "c.avif"]);
    }

    #[tokio::test]
    async fn test_single_mode_replaces_selection() {
        let store = Arc::new(MemoryBlobStore::new());
        let bench = Workbench::new(
            tool("remove-background"),
            Arc::new(ScriptedEndpoint::new()),
            store.clone(),
            ".",
        );
        bench.select(vec![jpg("a.jpg")]).await.unwrap();
        bench.select(vec![jpg("b.jpg")]).await.unwrap();

        let selected = bench.selected().await;
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "b.jpg");
        assert_eq!(store.live_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_remove_and_clear_release_everything() {
        let store = Arc::new(MemoryBlobStore::new());
        let bench = Workbench::new(
            tool("remove-background"),
            Arc::new(ScriptedEndpoint::new()),
            store.clone(),
            ".",
        );
        bench.set_mode(SelectionMode::Batch).await.unwrap();
        bench.select(vec![jpg("a.jpg"), jpg("b.jpg")]).await.unwrap();

        let first = bench.selected().await[0].id;
        assert!(bench.remove(first).await.unwrap());
        assert!(!bench.remove(first).await.unwrap());
        assert_eq!(store.live_count().await.unwrap(), 1);

        bench.convert(&ConversionParameters::default()).await.unwrap();
        // one preview plus one result
        assert_eq!(store.live_count().await.unwrap(), 2);

        bench.clear().await.unwrap();
        assert_eq!(bench.state().await, WorkbenchState::Idle);
        assert_eq!(store.live_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rerun_replaces_outcome() {
        let store = Arc::new(MemoryBlobStore::new());
        let bench = Workbench::new(
            tool("avif-to-jpg"),
            Arc::new(ScriptedEndpoint::new()),
            store.clone(),
            ".",
        );
        bench.select(vec![avif("a.avif")]).await.unwrap();
        bench.convert(&ConversionParameters::default()).await.unwrap();
        let first = bench.outcome().await.results()[0].blob;

        bench.convert(&ConversionParameters::default()).await.unwrap();
        let outcome = bench.outcome().await;
        assert_eq!(outcome.submitted(), 1);
        assert_ne!(outcome.results()[0].blob, first);
        assert!(!store.contains(&first).await.unwrap());
    }

    #[tokio::test]
    async fn test_bad_parameters_leave_state_untouched() {
        let bench = Workbench::new(
            tool("image-resizer"),
            Arc::new(ScriptedEndpoint::new()),
            Arc::new(MemoryBlobStore::new()),
            ".",
        );
        bench
            .select(vec![CandidateFile::new("a.png", None, b"png".to_vec())])
            .await
            .unwrap();
        let params = ConversionParameters {
            mode: Some("width".to_string()),
            ..Default::default()
        };
        let err = bench.convert(&params).await.unwrap_err();
        assert_eq!(err.client_message(), "Please enter a valid width");
        assert_eq!(bench.state().await, WorkbenchState::FilesSelected);
    }

    fn pdf(name: &str) -> CandidateFile {
        CandidateFile::new(name, None, b"%PDF".to_vec())
    }

    #[tokio::test]
    async fn test_merge_with_one_file_is_refused_without_state_change() {
        let endpoint = Arc::new(ScriptedEndpoint::new());
        let bench = Workbench::new(
            tool("merge-pdf"),
            endpoint.clone(),
            Arc::new(MemoryBlobStore::new()),
            ".",
        );
        bench.select(vec![pdf("a.pdf")]).await.unwrap();

        let err = bench.convert(&ConversionParameters::default()).await.unwrap_err();
        assert_eq!(err.class(), ErrorClass::Selection);
        assert_eq!(err.client_message(), "Please select at least 2 files");
        assert_eq!(bench.state().await, WorkbenchState::FilesSelected);
        assert_eq!(endpoint.combined_calls(), 0);
    }

    #[tokio::test]
    async fn test_refused_merge_keeps_previous_results() {
        let store = Arc::new(MemoryBlobStore::new());
        let bench = Workbench::new(
            tool("merge-pdf"),
            Arc::new(ScriptedEndpoint::new()),
            store.clone(),
            ".",
        );
        bench.select(vec![pdf("a.pdf"), pdf("b.pdf")]).await.unwrap();
        bench.convert(&ConversionParameters::default()).await.unwrap();
        let merged = bench.outcome().await.results()[0].blob;

        let second = bench.selected().await[1].id;
        bench.remove(second).await.unwrap();
        assert!(bench.convert(&ConversionParameters::default()).await.is_err());

        assert_eq!(bench.state().await, WorkbenchState::Converted);
        assert_eq!(bench.outcome().await.results()[0].blob, merged);
        assert!(store.contains(&merged).await.unwrap());
    }

    #[tokio::test]
    async fn test_report_tool_is_refused_without_state_change() {
        let bench = Workbench::new(
            tool("transparent-background-preview"),
            Arc::new(ScriptedEndpoint::new()),
            Arc::new(MemoryBlobStore::new()),
            ".",
        );
        bench
            .select(vec![CandidateFile::new("a.png", None, b"png".to_vec())])
            .await
            .unwrap();
        let err = bench.convert(&ConversionParameters::default()).await.unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedOperation(_)));
        assert_eq!(bench.state().await, WorkbenchState::FilesSelected);
    }

    #[tokio::test]
    async fn test_abandoned_run_does_not_leave_session_busy() {
        let endpoint = Arc::new(ScriptedEndpoint::new().with_latency(Duration::from_millis(200)));
        let bench = Workbench::new(
            tool("avif-to-jpg"),
            endpoint.clone(),
            Arc::new(MemoryBlobStore::new()),
            ".",
        );
        bench.select(vec![avif("a.avif")]).await.unwrap();

        let abandoned = tokio::time::timeout(
            Duration::from_millis(20),
            bench.convert(&ConversionParameters::default()),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(bench.state().await, WorkbenchState::FilesSelected);

        let note = bench.convert(&ConversionParameters::default()).await.unwrap();
        assert_eq!(note.message, "Conversion completed successfully!");
        assert_eq!(bench.state().await, WorkbenchState::Converted);
    }
}
