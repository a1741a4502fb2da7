//! Tracing subscriber setup.

use crate::{Result, SyncError};
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` when set, falling back to `info`.
/// Calling this twice returns an error rather than panicking.
pub fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| SyncError::Config(format!("tracing init: {}", e)))
}
