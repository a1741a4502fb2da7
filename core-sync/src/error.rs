use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// Required configuration is missing; the run never starts
    #[error("Invalid configuration: {0}")]
    Validation(String),

    /// A sync run is already active on this orchestrator
    #[error("A sync run is already in progress")]
    SyncInProgress,

    /// A tracked download of this asset is already in flight
    #[error("Asset {0} is already downloading")]
    DownloadInFlight(String),

    /// Network-level failure on a phase-level HTTP call
    #[error("Transport error: {0}")]
    Transport(String),

    /// The remote script ran but reported an application-level failure
    #[error("Error: {message}")]
    RemoteScript { message: String },

    #[error("Filesystem error: {0}")]
    Filesystem(String),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Sync cancelled")]
    Cancelled,

    #[error("Invalid phase transition from {from} to {to}")]
    InvalidPhaseTransition { from: String, to: String },

    #[error("Invalid sync phase: {0}")]
    InvalidPhase(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Configuration store error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
