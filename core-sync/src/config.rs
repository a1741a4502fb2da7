//! Sync configuration.
//!
//! Everything a run needs up front: the remote endpoints, the local
//! destination, timeouts, and the sprite import settings applied to
//! downloaded images. Persisted as JSON so an editor front end can
//! round-trip it.

use crate::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default timeout for the manifest-regeneration trigger call.
pub const DEFAULT_TRIGGER_TIMEOUT_SECS: u64 = 60;
/// Default timeout for a single asset download.
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;
/// How long a tracked download keeps its finished progress entry visible.
pub const DEFAULT_PROGRESS_HOLD_MS: u64 = 500;

const MIN_PIXELS_PER_UNIT: u32 = 1;
const MAX_PIXELS_PER_UNIT: u32 = 100;

// ============================================================================
// Sprite import settings
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureType {
    Default,
    Sprite,
    NormalMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    Point,
    Bilinear,
    Trilinear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    Uncompressed,
    Compressed,
    CompressedHq,
    CompressedLq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpriteImportMode {
    Single,
    Multiple,
}

/// Import settings applied to each downloaded image asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpriteSettings {
    pub texture_type: TextureType,
    pub pixels_per_unit: u32,
    pub filter_mode: FilterMode,
    pub compression: Compression,
    pub import_mode: SpriteImportMode,
    pub alpha_is_transparency: bool,
}

impl SpriteSettings {
    /// Pixels-per-unit with the supported range enforced.
    pub fn clamped_pixels_per_unit(&self) -> u32 {
        self.pixels_per_unit
            .clamp(MIN_PIXELS_PER_UNIT, MAX_PIXELS_PER_UNIT)
    }
}

impl Default for SpriteSettings {
    fn default() -> Self {
        Self {
            texture_type: TextureType::Sprite,
            pixels_per_unit: 100,
            filter_mode: FilterMode::Bilinear,
            compression: Compression::Uncompressed,
            import_mode: SpriteImportMode::Single,
            alpha_is_transparency: true,
        }
    }
}

// ============================================================================
// Run configuration
// ============================================================================

/// Full configuration for a sync run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Drive folder ID or share link naming the remote asset folder
    pub folder_id: String,
    /// Apps Script web-app URL that regenerates the manifest
    pub script_url: String,
    /// Published CSV manifest URL
    pub manifest_url: String,
    /// Local path the fetched manifest text is written to
    pub manifest_path: PathBuf,
    /// Root directory downloaded assets land under
    pub dest_root: PathBuf,
    #[serde(default = "default_trigger_timeout")]
    pub trigger_timeout_secs: u64,
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,
    #[serde(default = "default_progress_hold")]
    pub progress_hold_ms: u64,
    #[serde(default)]
    pub sprite: SpriteSettings,
}

fn default_trigger_timeout() -> u64 {
    DEFAULT_TRIGGER_TIMEOUT_SECS
}

fn default_download_timeout() -> u64 {
    DEFAULT_DOWNLOAD_TIMEOUT_SECS
}

fn default_progress_hold() -> u64 {
    DEFAULT_PROGRESS_HOLD_MS
}

impl SyncConfig {
    /// Validate that every field a run depends on is present.
    pub fn validate(&self) -> Result<()> {
        if self.folder_id.trim().is_empty() {
            return Err(SyncError::Validation("folder_id is empty".to_string()));
        }
        if self.script_url.trim().is_empty() {
            return Err(SyncError::Validation("script_url is empty".to_string()));
        }
        if self.manifest_url.trim().is_empty() {
            return Err(SyncError::Validation("manifest_url is empty".to_string()));
        }
        if self.dest_root.as_os_str().is_empty() {
            return Err(SyncError::Validation("dest_root is empty".to_string()));
        }
        Ok(())
    }

    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SyncError::Config(format!("read {}: {}", path.display(), e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| SyncError::Config(format!("parse {}: {}", path.display(), e)))
    }

    /// Persist configuration as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)
            .map_err(|e| SyncError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SyncError::Config(format!("create {}: {}", parent.display(), e)))?;
        }
        std::fs::write(path, raw)
            .map_err(|e| SyncError::Config(format!("write {}: {}", path.display(), e)))
    }
}
