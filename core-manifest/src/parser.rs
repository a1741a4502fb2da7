//! Manifest CSV parser.
//!
//! The manifest is a hand-edited spreadsheet export: a header row plus
//! data rows of `name,download_url,path`. Rows are frequently partial or
//! malformed, so anything that does not yield the required three fields
//! is skipped silently rather than treated as an error.

use crate::error::{ManifestError, Result};
use crate::record::AssetRecord;
use bridge_traits::FileSystemAccess;
use std::path::Path;

/// Number of fields a data row must provide.
const REQUIRED_FIELDS: usize = 3;

/// Parse raw manifest text into asset records.
///
/// Splits on line boundaries, drops the header row and blank lines,
/// strips embedded double quotes, and splits each row on commas capped
/// at three fields so commas inside the path column survive verbatim.
/// Rows with fewer than three fields, or an empty name, are dropped.
///
/// Empty or header-only input yields an empty vec, never an error.
pub fn parse(raw: &str) -> Vec<AssetRecord> {
    raw.split(['\n', '\r'])
        .filter(|line| !line.trim().is_empty())
        .skip(1)
        .filter_map(parse_row)
        .collect()
}

/// Parse manifest bytes, validating UTF-8 first.
pub fn parse_bytes(raw: &[u8]) -> Result<Vec<AssetRecord>> {
    Ok(parse(std::str::from_utf8(raw)?))
}

/// Load and parse the locally persisted manifest file.
///
/// A missing file is an empty manifest, not an error.
pub async fn load(path: &Path, fs: &dyn FileSystemAccess) -> Result<Vec<AssetRecord>> {
    let present = fs
        .exists(path)
        .await
        .map_err(|e| ManifestError::Io(e.to_string()))?;
    if !present {
        return Ok(Vec::new());
    }

    let raw = fs
        .read_file(path)
        .await
        .map_err(|e| ManifestError::Io(e.to_string()))?;
    parse_bytes(&raw)
}

fn parse_row(line: &str) -> Option<AssetRecord> {
    let pruned = line.replace('"', "");
    let fields: Vec<&str> = pruned.splitn(REQUIRED_FIELDS, ',').collect();

    if fields.len() < REQUIRED_FIELDS {
        return None;
    }

    let name = fields[0].trim();
    if name.is_empty() {
        return None;
    }

    Some(AssetRecord::new(name, fields[1].trim(), fields[2].trim()))
}
