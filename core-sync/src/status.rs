//! Read-only view over the shared run state.
//!
//! UI layers poll this instead of holding the orchestrator itself, so
//! status display never competes with the run task for anything beyond
//! a short-lived lock.

use crate::state::{SyncPhase, SyncSnapshot, SyncState};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Cloneable handle for observing a run without mutating it.
#[derive(Clone)]
pub struct StatusReporter {
    state: Arc<Mutex<SyncState>>,
}

impl StatusReporter {
    pub(crate) fn new(state: Arc<Mutex<SyncState>>) -> Self {
        Self { state }
    }

    /// Point-in-time copy of the full run state
    pub async fn snapshot(&self) -> SyncSnapshot {
        self.state.lock().await.snapshot()
    }

    pub async fn phase(&self) -> SyncPhase {
        self.state.lock().await.phase
    }

    /// Progress fraction of an in-flight asset, `None` once it settles
    pub async fn progress_of(&self, name: &str) -> Option<f32> {
        self.state.lock().await.progress.get(name).copied()
    }

    /// Whether any asset download is currently tracked
    pub async fn any_in_flight(&self) -> bool {
        !self.state.lock().await.in_flight.is_empty()
    }
}
