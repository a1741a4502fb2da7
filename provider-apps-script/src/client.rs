//! Apps Script trigger client.
//!
//! Invoking the web app re-indexes the Drive folder and refreshes the
//! published manifest sheet. The call is a plain GET with the folder ID
//! as a query parameter; the response is a small JSON status payload.

use crate::error::{Result, ScriptError};
use crate::types::ScriptResponse;
use bridge_traits::{HttpClient, HttpRequest};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Default timeout for the trigger call. Script executions that walk a
/// large folder tree can take tens of seconds.
pub const DEFAULT_TRIGGER_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for the manifest-generation web app.
pub struct AppsScriptClient {
    http: Arc<dyn HttpClient>,
    timeout: Duration,
}

impl AppsScriptClient {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            timeout: DEFAULT_TRIGGER_TIMEOUT,
        }
    }

    pub fn with_timeout(http: Arc<dyn HttpClient>, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    /// Trigger a manifest regeneration for `folder_id`.
    ///
    /// Two failure channels are kept distinct: transport-level failures
    /// (network error, non-success HTTP status) become
    /// [`ScriptError::Transport`], while an HTTP 200 whose payload says
    /// `status == "error"` becomes [`ScriptError::Script`].
    pub async fn trigger(&self, script_url: &str, folder_id: &str) -> Result<()> {
        let url = format!("{}?folderId={}", script_url, folder_id);
        debug!(url = %url, "Triggering Apps Script");

        let request = HttpRequest::get(url).timeout(self.timeout);
        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| ScriptError::Transport(e.to_string()))?;

        if !response.is_success() {
            return Err(ScriptError::Transport(format!(
                "HTTP {} from script endpoint",
                response.status
            )));
        }

        let payload: ScriptResponse = response
            .json()
            .map_err(|e| ScriptError::InvalidResponse(e.to_string()))?;

        if payload.is_error() {
            return Err(ScriptError::Script {
                message: payload
                    .message
                    .unwrap_or_else(|| "script reported an error".to_string()),
            });
        }

        info!(folder_id = %folder_id, "Apps Script run completed");
        Ok(())
    }
}
