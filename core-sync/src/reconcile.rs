//! Local store reconciliation.
//!
//! After a successful download pass, any regular file under the store
//! root whose file name is not in the manifest is an orphan and gets
//! deleted. Matching is by file name only, so a manifest entry keeps a
//! same-named file alive anywhere in the tree.

use crate::events::{EventBus, SyncEvent};
use crate::{Result, SyncError};
use bridge_traits::FileSystemAccess;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Counters from one reconcile pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub scanned: usize,
    pub deleted: usize,
}

/// Deletes local files the manifest no longer names.
pub struct StoreReconciler {
    fs: Arc<dyn FileSystemAccess>,
    events: EventBus,
}

impl StoreReconciler {
    pub fn new(fs: Arc<dyn FileSystemAccess>, events: EventBus) -> Self {
        Self { fs, events }
    }

    /// Remove every file under `root` whose name is absent from
    /// `expected`.
    ///
    /// A listing failure aborts the pass; a single failed deletion is
    /// logged and skipped so one locked file cannot strand the rest of
    /// the orphans.
    pub async fn reconcile(
        &self,
        expected: &HashSet<String>,
        root: &Path,
    ) -> Result<ReconcileStats> {
        let files = self
            .fs
            .list_files(root)
            .await
            .map_err(|e| SyncError::Filesystem(format!("list {}: {}", root.display(), e)))?;

        let mut stats = ReconcileStats {
            scanned: files.len(),
            ..Default::default()
        };

        for path in files {
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            if expected.contains(&name) {
                continue;
            }

            match self.fs.delete_file(&path).await {
                Ok(()) => {
                    stats.deleted += 1;
                    self.events.emit(SyncEvent::OrphanDeleted { name });
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to delete orphan");
                }
            }
            tokio::task::yield_now().await;
        }

        info!(
            scanned = stats.scanned,
            deleted = stats.deleted,
            "Reconcile pass finished"
        );
        Ok(stats)
    }
}
