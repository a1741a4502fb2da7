//! # Core Sync Engine
//!
//! Orchestrates the Drive-to-local asset pipeline: trigger the remote
//! manifest regeneration, fetch and parse the manifest, stream each
//! asset to the local store with live progress, then reconcile the
//! store by deleting files the manifest no longer names.
//!
//! Entry point is [`SyncOrchestrator`]; observe a run through its
//! [`StatusReporter`] or by subscribing to [`SyncEvent`]s.

pub mod config;
pub mod download;
pub mod error;
pub mod events;
pub mod logging;
pub mod orchestrator;
pub mod postprocess;
pub mod reconcile;
pub mod state;
pub mod status;

pub use config::{SpriteSettings, SyncConfig};
pub use download::{AssetDownloader, DownloadOutcome};
pub use error::{Result, SyncError};
pub use events::{EventBus, SyncEvent};
pub use logging::init_logging;
pub use orchestrator::SyncOrchestrator;
pub use postprocess::{AssetPostProcessor, NoopPostProcessor};
pub use reconcile::{ReconcileStats, StoreReconciler};
pub use state::{SyncPhase, SyncSnapshot};
pub use status::StatusReporter;
