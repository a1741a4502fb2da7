//! Canonical asset record type.
//!
//! One record per manifest row: the asset's file name (which doubles as
//! the store key and local file name), its download URL, and the
//! destination subdirectory relative to the store root.

use serde::{Deserialize, Serialize};

/// Prefix of the manifest path column naming the remote root folder.
/// It is stripped when deriving the local destination subdirectory.
const PATH_PREFIX: &str = "Art";

/// An immutable asset entry parsed from the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Unique file name, used as both store key and local filename
    pub name: String,
    /// Source URL the asset is downloaded from
    pub download_url: String,
    /// Destination subdirectory under the store root, possibly empty
    pub relative_path: String,
}

impl AssetRecord {
    /// Build a record from raw manifest fields.
    ///
    /// The path field has the fixed remote-root prefix stripped; a field
    /// shorter than the prefix yields an empty relative path.
    pub fn new(
        name: impl Into<String>,
        download_url: impl Into<String>,
        path_field: &str,
    ) -> Self {
        Self {
            name: name.into(),
            download_url: download_url.into(),
            relative_path: strip_path_prefix(path_field),
        }
    }

    /// Whether this asset takes the image download path (`.png`, `.jpg`,
    /// `.jpeg`, case-insensitive).
    pub fn is_image(&self) -> bool {
        let lower = self.name.to_ascii_lowercase();
        lower.ends_with(".png") || lower.ends_with(".jpg") || lower.ends_with(".jpeg")
    }
}

/// Strip the remote-root prefix from a manifest path column.
///
/// Tolerates an optional leading slash before the prefix. Never panics:
/// fields shorter than the prefix (or cut mid-character) become "".
fn strip_path_prefix(path_field: &str) -> String {
    let trimmed = path_field.strip_prefix('/').unwrap_or(path_field);

    match trimmed.strip_prefix(PATH_PREFIX) {
        Some(rest) => rest.to_string(),
        None => trimmed.get(PATH_PREFIX.len()..).unwrap_or("").to_string(),
    }
}
