//! Sync event bus.
//!
//! Broadcast channel for run lifecycle notifications. Emission never
//! blocks and never fails the run: when no subscriber is listening the
//! send result is simply dropped.

use crate::state::SyncPhase;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Default broadcast capacity; slow subscribers lag rather than block.
const DEFAULT_CAPACITY: usize = 256;

/// Notification emitted during a sync run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    Started {
        run_id: Uuid,
    },
    PhaseChanged {
        run_id: Uuid,
        phase: SyncPhase,
    },
    AssetCompleted {
        name: String,
    },
    AssetFailed {
        name: String,
        message: String,
    },
    OrphanDeleted {
        name: String,
    },
    Completed {
        run_id: Uuid,
        downloaded: usize,
        failed: usize,
        deleted: usize,
    },
    Failed {
        run_id: Uuid,
        message: String,
    },
    Cancelled {
        run_id: Uuid,
        completed: usize,
    },
}

impl SyncEvent {
    /// Human-readable one-line description for log output
    pub fn description(&self) -> String {
        match self {
            SyncEvent::Started { run_id } => format!("Sync run {} started", run_id),
            SyncEvent::PhaseChanged { phase, .. } => format!("Phase changed to {}", phase),
            SyncEvent::AssetCompleted { name } => format!("Downloaded {}", name),
            SyncEvent::AssetFailed { name, message } => {
                format!("Failed to download {}: {}", name, message)
            }
            SyncEvent::OrphanDeleted { name } => format!("Deleted orphan {}", name),
            SyncEvent::Completed {
                downloaded,
                failed,
                deleted,
                ..
            } => format!(
                "Sync completed: {} downloaded, {} failed, {} deleted",
                downloaded, failed, deleted
            ),
            SyncEvent::Failed { message, .. } => format!("Sync failed: {}", message),
            SyncEvent::Cancelled { completed, .. } => {
                format!("Sync cancelled after {} assets", completed)
            }
        }
    }
}

/// Fan-out channel for [`SyncEvent`]s.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SyncEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all current subscribers.
    pub fn emit(&self, event: SyncEvent) {
        // No subscribers is not an error
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
