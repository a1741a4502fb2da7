//! # Sync Phase State Machine & Shared Run State
//!
//! The orchestrator drives one run at a time through a fixed phase
//! sequence with validated transitions:
//!
//! ```text
//! Idle → TriggeringRemote → AwaitingRemote → FetchingManifest
//!      → Downloading → Reconciling → Completed
//!                 ↓            ↓
//!             Cancelled      Failed   (Failed reachable from any active phase)
//! ```
//!
//! `SyncState` is the single mutable record of a run: phase, counters,
//! the per-asset progress map, and the in-flight set. It lives behind an
//! async mutex owned by the orchestrator; readers only ever receive
//! cloned [`SyncSnapshot`]s.

use crate::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

// ============================================================================
// Phase
// ============================================================================

/// A named stage of the sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// No run active; the orchestrator accepts a start request
    Idle,
    /// Normalizing the folder ID before the remote call
    TriggeringRemote,
    /// Waiting on the remote manifest-generation script
    AwaitingRemote,
    /// Fetching the regenerated manifest text
    FetchingManifest,
    /// Sequential per-asset download loop
    Downloading,
    /// Deleting local files absent from the manifest
    Reconciling,
    /// Terminal: run finished successfully
    Completed,
    /// Terminal: run cancelled during the download loop
    Cancelled,
    /// Terminal: a phase-level error halted the run
    Failed,
}

impl SyncPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SyncPhase::Completed | SyncPhase::Cancelled | SyncPhase::Failed
        )
    }

    /// Whether a run is actively executing (neither idle nor terminal)
    pub fn is_active(&self) -> bool {
        !matches!(self, SyncPhase::Idle) && !self.is_terminal()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPhase::Idle => "idle",
            SyncPhase::TriggeringRemote => "triggering_remote",
            SyncPhase::AwaitingRemote => "awaiting_remote",
            SyncPhase::FetchingManifest => "fetching_manifest",
            SyncPhase::Downloading => "downloading",
            SyncPhase::Reconciling => "reconciling",
            SyncPhase::Completed => "completed",
            SyncPhase::Cancelled => "cancelled",
            SyncPhase::Failed => "failed",
        }
    }

    fn can_transition(&self, to: SyncPhase) -> bool {
        use SyncPhase::*;
        matches!(
            (self, to),
            (Idle, TriggeringRemote)
                | (TriggeringRemote, AwaitingRemote)
                | (AwaitingRemote, FetchingManifest)
                | (FetchingManifest, Downloading)
                | (Downloading, Reconciling)
                | (Downloading, Cancelled)
                | (Reconciling, Completed)
        ) || (self.is_active() && to == Failed)
    }
}

impl FromStr for SyncPhase {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "idle" => Ok(SyncPhase::Idle),
            "triggering_remote" => Ok(SyncPhase::TriggeringRemote),
            "awaiting_remote" => Ok(SyncPhase::AwaitingRemote),
            "fetching_manifest" => Ok(SyncPhase::FetchingManifest),
            "downloading" => Ok(SyncPhase::Downloading),
            "reconciling" => Ok(SyncPhase::Reconciling),
            "completed" => Ok(SyncPhase::Completed),
            "cancelled" => Ok(SyncPhase::Cancelled),
            "failed" => Ok(SyncPhase::Failed),
            _ => Err(SyncError::InvalidPhase(s.to_string())),
        }
    }
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Shared run state
// ============================================================================

/// Mutable state of the orchestrator, one instance per orchestrator.
///
/// Mutated only by the run task and the redownload tasks, always under
/// the orchestrator's mutex. Per-asset progress values are clamped to
/// `0.0..=1.0` and never move backwards within one download.
#[derive(Debug)]
pub struct SyncState {
    pub phase: SyncPhase,
    pub total_assets: usize,
    pub completed: usize,
    pub failed: usize,
    pub current_asset: Option<String>,
    pub progress: HashMap<String, f32>,
    pub in_flight: HashSet<String>,
    pub cancel_requested: bool,
    pub message: String,
}

impl SyncState {
    pub fn new() -> Self {
        Self {
            phase: SyncPhase::Idle,
            total_assets: 0,
            completed: 0,
            failed: 0,
            current_asset: None,
            progress: HashMap::new(),
            in_flight: HashSet::new(),
            cancel_requested: false,
            message: String::new(),
        }
    }

    /// Reset to a fresh Idle state at the start of a run.
    ///
    /// Tracked redownload entries survive the reset so an independent
    /// redownload is not orphaned by a full sync starting.
    pub fn reset_for_run(&mut self) {
        self.phase = SyncPhase::Idle;
        self.total_assets = 0;
        self.completed = 0;
        self.failed = 0;
        self.current_asset = None;
        self.cancel_requested = false;
        self.message.clear();
    }

    /// Transition to `to`, validating against the phase table.
    pub fn set_phase(&mut self, to: SyncPhase) -> Result<()> {
        if !self.phase.can_transition(to) {
            return Err(SyncError::InvalidPhaseTransition {
                from: self.phase.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }
        self.phase = to;
        Ok(())
    }

    /// Force a terminal failure regardless of the current phase.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.phase = SyncPhase::Failed;
        self.message = message.into();
    }

    /// Mark an asset as in flight with zero progress.
    pub fn begin_tracking(&mut self, name: &str) {
        self.in_flight.insert(name.to_string());
        self.progress.insert(name.to_string(), 0.0);
    }

    /// Update a tracked asset's progress fraction.
    ///
    /// Values are clamped to `0.0..=1.0`; regressions are ignored so the
    /// reported fraction is monotonically non-decreasing. Names that were
    /// never tracked are ignored.
    pub fn update_progress(&mut self, name: &str, fraction: f32) {
        if let Some(entry) = self.progress.get_mut(name) {
            let fraction = fraction.clamp(0.0, 1.0);
            if fraction > *entry {
                *entry = fraction;
            }
        }
    }

    /// Drop the in-flight and progress markers for an asset.
    pub fn clear_tracking(&mut self, name: &str) {
        self.in_flight.remove(name);
        self.progress.remove(name);
    }

    /// Drop all in-flight and progress markers (cancellation path).
    pub fn clear_all_tracking(&mut self) {
        self.in_flight.clear();
        self.progress.clear();
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        SyncSnapshot {
            phase: self.phase,
            total_assets: self.total_assets,
            completed: self.completed,
            failed: self.failed,
            current_asset: self.current_asset.clone(),
            progress: self.progress.clone(),
            in_flight: self.in_flight.clone(),
            cancel_requested: self.cancel_requested,
            message: self.message.clone(),
        }
    }
}

impl Default for SyncState {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the run state, safe to hand to any caller.
#[derive(Debug, Clone, Serialize)]
pub struct SyncSnapshot {
    pub phase: SyncPhase,
    pub total_assets: usize,
    pub completed: usize,
    pub failed: usize,
    pub current_asset: Option<String>,
    pub progress: HashMap<String, f32>,
    pub in_flight: HashSet<String>,
    pub cancel_requested: bool,
    pub message: String,
}

impl SyncSnapshot {
    /// Overall run fraction across all assets (0.0 when none discovered)
    pub fn overall_fraction(&self) -> f32 {
        if self.total_assets == 0 {
            0.0
        } else {
            (self.completed + self.failed) as f32 / self.total_assets as f32
        }
    }

    /// Progress fraction of one asset, if it is currently tracked
    pub fn progress_of(&self, name: &str) -> Option<f32> {
        self.progress.get(name).copied()
    }
}

// ============================================================================
// Tests
// ============================================================================
