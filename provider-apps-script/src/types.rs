//! Apps Script web-app response types.

use serde::{Deserialize, Serialize};

/// JSON body returned by the manifest-generation web app.
///
/// The endpoint answers HTTP 200 even when the script fails internally,
/// signalling the failure through `status == "error"` instead. Callers
/// must check both channels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptResponse {
    /// `"ok"` or `"error"`
    pub status: String,

    /// Human-readable detail, present on errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ScriptResponse {
    pub fn is_error(&self) -> bool {
        self.status == "error"
    }
}
