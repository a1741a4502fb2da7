//! Post-download asset processing seam.
//!
//! Image assets get their import settings applied after the file lands
//! on disk. The engine itself only knows the seam; an editor
//! integration supplies the real implementation.

use crate::config::SpriteSettings;
use async_trait::async_trait;
use std::path::Path;

/// Hook invoked after an image asset is written to disk.
///
/// Processing runs detached from the download loop; a failure here is
/// logged and never fails the asset or the run.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssetPostProcessor: Send + Sync {
    async fn process(&self, path: &Path, settings: &SpriteSettings) -> bridge_traits::Result<()>;
}

/// Post-processor that does nothing. Used when no editor integration
/// is attached, and in tests that only care about the download side.
pub struct NoopPostProcessor;

#[async_trait]
impl AssetPostProcessor for NoopPostProcessor {
    async fn process(&self, _path: &Path, _settings: &SpriteSettings) -> bridge_traits::Result<()> {
        Ok(())
    }
}
