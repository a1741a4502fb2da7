//! Drive folder-ID normalization.
//!
//! Users paste whatever the Drive UI hands them: a bare folder ID, a
//! `Share > Copy link` URL, or a folder URL. All of these reduce to the
//! ID segment after `/folders/`, up to the next `?`.

use crate::error::{Result, ScriptError};
use tracing::debug;

const FOLDERS_SEGMENT: &str = "/folders/";
const MIN_ID_LEN: usize = 25;
const MAX_ID_LEN: usize = 35;

/// Extract and validate a Drive folder ID from a raw ID or share link.
///
/// Characters outside `[A-Za-z0-9_-]` are stripped before validation;
/// anything that does not then look like a folder ID (25–35 chars of
/// that alphabet) is rejected.
pub fn normalize(link: &str) -> Result<String> {
    if link.is_empty() {
        return Err(ScriptError::InvalidFolderId("empty input".to_string()));
    }

    let extracted = if !link.contains("drive.google.com") {
        link.trim().to_string()
    } else {
        let folders_index = link.find(FOLDERS_SEGMENT).ok_or_else(|| {
            ScriptError::InvalidFolderId(format!("missing '{}' in link", FOLDERS_SEGMENT))
        })?;

        let start = folders_index + FOLDERS_SEGMENT.len();
        let rest = &link[start..];
        let end = rest.find('?').unwrap_or(rest.len());
        rest[..end].to_string()
    };

    let cleaned: String = extracted
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();

    if is_valid_folder_id(&cleaned) {
        debug!(folder_id = %cleaned, "Extracted valid folder ID");
        Ok(cleaned)
    } else {
        Err(ScriptError::InvalidFolderId(cleaned))
    }
}

fn is_valid_folder_id(id: &str) -> bool {
    (MIN_ID_LEN..=MAX_ID_LEN).contains(&id.len())
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
