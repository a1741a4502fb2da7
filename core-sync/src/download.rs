//! Streaming asset downloader.
//!
//! One asset at a time: open a streaming fetch, accumulate the body
//! while publishing a byte-derived progress fraction, and only write the
//! destination file once the full body has arrived. A failed or
//! cancelled transfer never touches the existing file on disk.

use crate::config::SpriteSettings;
use crate::events::{EventBus, SyncEvent};
use crate::state::SyncState;
use crate::AssetPostProcessor;
use bridge_traits::{FileSystemAccess, HttpClient};
use bytes::{Bytes, BytesMut};
use core_manifest::AssetRecord;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How an individual asset transfer ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Completed,
    Failed(String),
    Cancelled,
}

enum Transfer {
    Body(Bytes),
    Cancelled,
}

/// Downloads one asset per call against the shared run state.
#[derive(Clone)]
pub struct AssetDownloader {
    http: Arc<dyn HttpClient>,
    fs: Arc<dyn FileSystemAccess>,
    state: Arc<Mutex<SyncState>>,
    events: EventBus,
    post: Arc<dyn AssetPostProcessor>,
    sprite: SpriteSettings,
    dest_root: PathBuf,
    timeout: Duration,
    progress_hold: Duration,
}

impl AssetDownloader {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        http: Arc<dyn HttpClient>,
        fs: Arc<dyn FileSystemAccess>,
        state: Arc<Mutex<SyncState>>,
        events: EventBus,
        post: Arc<dyn AssetPostProcessor>,
        sprite: SpriteSettings,
        dest_root: PathBuf,
        timeout: Duration,
        progress_hold: Duration,
    ) -> Self {
        Self {
            http,
            fs,
            state,
            events,
            post,
            sprite,
            dest_root,
            timeout,
            progress_hold,
        }
    }

    /// Destination path for a record: the relative path segment under the
    /// store root, then the asset name.
    pub fn destination(&self, record: &AssetRecord) -> PathBuf {
        let relative = record.relative_path.trim_start_matches('/');
        if relative.is_empty() {
            self.dest_root.join(&record.name)
        } else {
            self.dest_root.join(relative).join(&record.name)
        }
    }

    /// Download one asset.
    ///
    /// `tracked` downloads publish an in-flight marker and a progress
    /// fraction in the shared state, and hold the finished entry briefly
    /// so a polling UI can observe completion before it disappears.
    pub async fn download(
        &self,
        record: &AssetRecord,
        cancel: &CancellationToken,
        tracked: bool,
    ) -> DownloadOutcome {
        if tracked {
            self.state.lock().await.begin_tracking(&record.name);
        }

        let outcome = match tokio::time::timeout(self.timeout, self.transfer(record, cancel)).await
        {
            Ok(Ok(Transfer::Body(body))) => self.finish(record, body).await,
            Ok(Ok(Transfer::Cancelled)) => DownloadOutcome::Cancelled,
            Ok(Err(message)) => DownloadOutcome::Failed(message),
            Err(_) => DownloadOutcome::Failed(format!(
                "timed out after {} seconds",
                self.timeout.as_secs()
            )),
        };

        match &outcome {
            DownloadOutcome::Completed => {
                self.events.emit(SyncEvent::AssetCompleted {
                    name: record.name.clone(),
                });
            }
            DownloadOutcome::Failed(message) => {
                warn!(asset = %record.name, error = %message, "Asset download failed");
                self.events.emit(SyncEvent::AssetFailed {
                    name: record.name.clone(),
                    message: message.clone(),
                });
            }
            DownloadOutcome::Cancelled => {
                debug!(asset = %record.name, "Asset download cancelled");
            }
        }

        if tracked {
            if outcome == DownloadOutcome::Completed && !self.progress_hold.is_zero() {
                tokio::time::sleep(self.progress_hold).await;
            }
            self.state.lock().await.clear_tracking(&record.name);
        }

        outcome
    }

    /// Stream the body, updating the progress fraction as bytes arrive.
    async fn transfer(
        &self,
        record: &AssetRecord,
        cancel: &CancellationToken,
    ) -> std::result::Result<Transfer, String> {
        let fetched = self
            .http
            .fetch(record.download_url.clone())
            .await
            .map_err(|e| e.to_string())?;

        let mut reader = fetched.reader;
        let mut body = BytesMut::new();

        loop {
            tokio::select! {
                // Cancellation wins over a ready read
                biased;
                _ = cancel.cancelled() => {
                    return Ok(Transfer::Cancelled);
                }
                read = reader.read_buf(&mut body) => {
                    match read {
                        Ok(0) => break,
                        Ok(_) => {
                            if let Some(total) = fetched.content_length {
                                if total > 0 {
                                    let fraction = body.len() as f32 / total as f32;
                                    self.state
                                        .lock()
                                        .await
                                        .update_progress(&record.name, fraction);
                                }
                            }
                        }
                        Err(e) => return Err(e.to_string()),
                    }
                }
            }
        }

        Ok(Transfer::Body(body.freeze()))
    }

    /// Write the completed body and kick off post-processing for images.
    async fn finish(&self, record: &AssetRecord, body: Bytes) -> DownloadOutcome {
        let dest = self.destination(record);
        if let Err(e) = self.fs.write_file(&dest, body).await {
            return DownloadOutcome::Failed(format!("write {}: {}", dest.display(), e));
        }

        self.state.lock().await.update_progress(&record.name, 1.0);

        if record.is_image() {
            let post = self.post.clone();
            let sprite = self.sprite.clone();
            let name = record.name.clone();
            tokio::spawn(async move {
                if let Err(e) = post.process(&dest, &sprite).await {
                    warn!(asset = %name, error = %e, "Post-processing failed");
                }
            });
        }

        DownloadOutcome::Completed
    }
}
