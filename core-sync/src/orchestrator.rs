//! # Sync Orchestrator
//!
//! Owns the end-to-end run: trigger the remote manifest regeneration,
//! fetch and parse the manifest, download each asset sequentially, then
//! reconcile the local store. Exactly one run is active per orchestrator;
//! a second start request is rejected without touching the current run.
//!
//! The orchestrator itself is cheap to clone (shared state behind Arcs),
//! which is how the spawned run task carries it.

use crate::config::SyncConfig;
use crate::download::{AssetDownloader, DownloadOutcome};
use crate::events::{EventBus, SyncEvent};
use crate::reconcile::StoreReconciler;
use crate::state::{SyncPhase, SyncState};
use crate::status::StatusReporter;
use crate::{AssetPostProcessor, Result, SyncError};
use bridge_traits::{FileSystemAccess, HttpClient, HttpRequest};
use core_manifest::AssetRecord;
use provider_apps_script::{folder_id, AppsScriptClient, ScriptError};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

struct ActiveRun {
    id: Uuid,
    token: CancellationToken,
}

/// Drives sync runs and standalone asset redownloads.
pub struct SyncOrchestrator {
    config: SyncConfig,
    http: Arc<dyn HttpClient>,
    fs: Arc<dyn FileSystemAccess>,
    post: Arc<dyn AssetPostProcessor>,
    script: Arc<AppsScriptClient>,
    state: Arc<Mutex<SyncState>>,
    events: EventBus,
    active: Arc<Mutex<Option<ActiveRun>>>,
    redownloads: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl SyncOrchestrator {
    pub fn new(
        config: SyncConfig,
        http: Arc<dyn HttpClient>,
        fs: Arc<dyn FileSystemAccess>,
        post: Arc<dyn AssetPostProcessor>,
    ) -> Self {
        let script = Arc::new(AppsScriptClient::with_timeout(
            http.clone(),
            Duration::from_secs(config.trigger_timeout_secs),
        ));
        Self {
            config,
            http,
            fs,
            post,
            script,
            state: Arc::new(Mutex::new(SyncState::new())),
            events: EventBus::new(),
            active: Arc::new(Mutex::new(None)),
            redownloads: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Read-only status handle for polling UIs.
    pub fn status(&self) -> StatusReporter {
        StatusReporter::new(self.state.clone())
    }

    /// Subscribe to run lifecycle events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    fn clone_for_task(&self) -> Self {
        Self {
            config: self.config.clone(),
            http: self.http.clone(),
            fs: self.fs.clone(),
            post: self.post.clone(),
            script: self.script.clone(),
            state: self.state.clone(),
            events: self.events.clone(),
            active: self.active.clone(),
            redownloads: self.redownloads.clone(),
        }
    }

    fn downloader(&self) -> AssetDownloader {
        AssetDownloader::new(
            self.http.clone(),
            self.fs.clone(),
            self.state.clone(),
            self.events.clone(),
            self.post.clone(),
            self.config.sprite.clone(),
            self.config.dest_root.clone(),
            Duration::from_secs(self.config.download_timeout_secs),
            Duration::from_millis(self.config.progress_hold_ms),
        )
    }

    // ========================================================================
    // Run lifecycle
    // ========================================================================

    /// Start a sync run.
    ///
    /// Validates the configuration, rejects the request when a run is
    /// already active, then spawns the pipeline and returns its run ID
    /// immediately.
    ///
    /// The active slot is the guard, claimed before the run task is
    /// spawned, so two back-to-back start calls can never both be
    /// accepted even though the phase only advances once the task runs.
    #[instrument(skip(self))]
    pub async fn start_sync(&self) -> Result<Uuid> {
        self.config.validate()?;

        let run_id = Uuid::new_v4();
        let token = CancellationToken::new();
        {
            let mut active = self.active.lock().await;
            if active.is_some() {
                return Err(SyncError::SyncInProgress);
            }

            let mut state = self.state.lock().await;
            if state.phase.is_active() {
                return Err(SyncError::SyncInProgress);
            }
            state.reset_for_run();

            *active = Some(ActiveRun {
                id: run_id,
                token: token.clone(),
            });
        }

        self.events.emit(SyncEvent::Started { run_id });
        info!(run_id = %run_id, "Starting sync run");

        let task = self.clone_for_task();
        tokio::spawn(async move {
            if let Err(e) = task.run_pipeline(run_id, token).await {
                task.fail_run(run_id, e).await;
            }
        });

        Ok(run_id)
    }

    /// Request cancellation of the active run.
    ///
    /// Cancellation is observed during the download loop; completed
    /// downloads stay on disk and reconciliation is skipped. Returns
    /// whether a run was active to cancel.
    #[instrument(skip(self))]
    pub async fn cancel(&self) -> bool {
        self.state.lock().await.cancel_requested = true;
        match self.active.lock().await.as_ref() {
            Some(run) => {
                info!(run_id = %run.id, "Cancellation requested");
                run.token.cancel();
                true
            }
            None => false,
        }
    }

    async fn run_pipeline(&self, run_id: Uuid, token: CancellationToken) -> Result<()> {
        // Phase 1: resolve the folder ID locally before any remote call
        self.advance(run_id, SyncPhase::TriggeringRemote).await?;
        let folder_id = folder_id::normalize(&self.config.folder_id)
            .map_err(|e| SyncError::Validation(e.to_string()))?;

        // Phase 2: ask the remote script to regenerate the manifest
        self.advance(run_id, SyncPhase::AwaitingRemote).await?;
        self.script
            .trigger(&self.config.script_url, &folder_id)
            .await
            .map_err(|e| match e {
                ScriptError::Script { message } => SyncError::RemoteScript { message },
                other => SyncError::Transport(other.to_string()),
            })?;

        // Phase 3: fetch and parse the regenerated manifest
        self.advance(run_id, SyncPhase::FetchingManifest).await?;
        let records = self.fetch_manifest().await?;

        // Phase 4: sequential download loop
        self.advance(run_id, SyncPhase::Downloading).await?;
        {
            let mut state = self.state.lock().await;
            state.total_assets = records.len();
        }

        let downloader = self.downloader();
        let mut completed = 0usize;
        let mut failed = 0usize;

        for record in &records {
            if token.is_cancelled() || self.state.lock().await.cancel_requested {
                return self.finish_cancelled(run_id, completed).await;
            }

            self.state.lock().await.current_asset = Some(record.name.clone());

            match downloader.download(record, &token, true).await {
                DownloadOutcome::Completed => completed += 1,
                DownloadOutcome::Failed(_) => failed += 1,
                DownloadOutcome::Cancelled => {
                    return self.finish_cancelled(run_id, completed).await;
                }
            }

            let mut state = self.state.lock().await;
            state.completed = completed;
            state.failed = failed;
        }

        self.state.lock().await.current_asset = None;

        // A cancel landing after the final download must still skip
        // reconciliation; deletion under cancellation is never allowed
        if token.is_cancelled() || self.state.lock().await.cancel_requested {
            return self.finish_cancelled(run_id, completed).await;
        }

        // Phase 5: delete local files the manifest no longer names
        self.advance(run_id, SyncPhase::Reconciling).await?;
        let expected: HashSet<String> = records.iter().map(|r| r.name.clone()).collect();
        let reconciler = StoreReconciler::new(self.fs.clone(), self.events.clone());
        let stats = reconciler
            .reconcile(&expected, &self.config.dest_root)
            .await?;

        // Phase 6: done
        self.advance(run_id, SyncPhase::Completed).await?;
        *self.active.lock().await = None;
        self.events.emit(SyncEvent::Completed {
            run_id,
            downloaded: completed,
            failed,
            deleted: stats.deleted,
        });
        info!(
            run_id = %run_id,
            downloaded = completed,
            failed,
            deleted = stats.deleted,
            "Sync run completed"
        );
        Ok(())
    }

    /// Fetch the manifest, persist its raw text, and parse it.
    async fn fetch_manifest(&self) -> Result<Vec<AssetRecord>> {
        let request = HttpRequest::get(self.config.manifest_url.clone())
            .timeout(Duration::from_secs(self.config.download_timeout_secs));
        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))?;

        if !response.is_success() {
            return Err(SyncError::Transport(format!(
                "HTTP {} fetching manifest",
                response.status
            )));
        }

        if let Err(e) = self
            .fs
            .write_file(&self.config.manifest_path, response.body.clone())
            .await
        {
            // The on-disk copy is informational; parsing proceeds
            warn!(error = %e, "Failed to persist manifest text");
        }

        let records = core_manifest::parse_bytes(&response.body)
            .map_err(|e| SyncError::Manifest(e.to_string()))?;
        info!(assets = records.len(), "Manifest parsed");
        Ok(records)
    }

    async fn advance(&self, run_id: Uuid, phase: SyncPhase) -> Result<()> {
        self.state.lock().await.set_phase(phase)?;
        self.events.emit(SyncEvent::PhaseChanged { run_id, phase });
        Ok(())
    }

    async fn finish_cancelled(&self, run_id: Uuid, completed: usize) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            state.set_phase(SyncPhase::Cancelled)?;
            state.current_asset = None;
        }
        *self.active.lock().await = None;
        self.events.emit(SyncEvent::Cancelled { run_id, completed });
        info!(run_id = %run_id, completed, "Sync run cancelled");
        Ok(())
    }

    async fn fail_run(&self, run_id: Uuid, err: SyncError) {
        let message = err.to_string();
        error!(run_id = %run_id, error = %message, "Sync run failed");
        {
            let mut state = self.state.lock().await;
            state.fail(message.clone());
            state.current_asset = None;
        }
        *self.active.lock().await = None;
        self.events.emit(SyncEvent::Failed { run_id, message });
    }

    // ========================================================================
    // Standalone redownloads
    // ========================================================================

    /// Records from the most recently persisted manifest file.
    ///
    /// This is what a redownload picker works from between runs; an absent
    /// manifest file yields an empty list.
    pub async fn local_manifest(&self) -> Result<Vec<AssetRecord>> {
        core_manifest::load(&self.config.manifest_path, self.fs.as_ref())
            .await
            .map_err(|e| SyncError::Manifest(e.to_string()))
    }

    /// Redownload a single asset outside a full run.
    ///
    /// Rejected while the same asset is already in flight, whether from
    /// the run loop or another redownload.
    #[instrument(skip(self, record), fields(asset = %record.name))]
    pub async fn redownload_asset(&self, record: AssetRecord) -> Result<()> {
        if self.state.lock().await.in_flight.contains(&record.name) {
            return Err(SyncError::DownloadInFlight(record.name));
        }

        let token = CancellationToken::new();
        {
            let mut redownloads = self.redownloads.lock().await;
            if redownloads.contains_key(&record.name) {
                return Err(SyncError::DownloadInFlight(record.name));
            }
            redownloads.insert(record.name.clone(), token.clone());
        }

        let task = self.clone_for_task();
        tokio::spawn(async move {
            let downloader = task.downloader();
            downloader.download(&record, &token, true).await;
            task.redownloads.lock().await.remove(&record.name);
        });

        Ok(())
    }

    /// Cancel an in-flight redownload. Returns whether one was found.
    pub async fn cancel_redownload(&self, name: &str) -> bool {
        match self.redownloads.lock().await.get(name) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}
