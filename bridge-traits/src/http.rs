//! HTTP Client Abstraction
//!
//! Buffered request/response exchange plus a streaming fetch for asset
//! bodies. The engine only ever issues GETs; POST and HEAD exist for
//! implementations that probe endpoints.

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{BridgeError, Result};

/// HTTP method types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Head,
}

/// HTTP request builder
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }
}

/// HTTP response
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    /// Decode the buffered body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| BridgeError::OperationFailed(format!("Malformed JSON body: {}", e)))
    }

    /// Decode the buffered body as UTF-8 text.
    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| BridgeError::OperationFailed(format!("Body is not UTF-8: {}", e)))
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Retry behavior for buffered requests.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Ceiling on the backoff delay
    pub max_delay: Duration,
    pub use_exponential_backoff: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            use_exponential_backoff: true,
        }
    }
}

/// Body of an in-progress download.
///
/// `content_length` is taken from the response headers when the server
/// provides one; callers derive a progress fraction from bytes read so far.
pub struct FetchedBody {
    pub content_length: Option<u64>,
    pub reader: Box<dyn tokio::io::AsyncRead + Send + Unpin>,
}

/// Async HTTP client trait
///
/// Abstracts HTTP operations so the sync engine can run against any
/// transport. Implementations should handle connection pooling and
/// TLS; retry behavior is driven by the supplied [`RetryPolicy`].
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request, buffering the full response body.
    ///
    /// # Errors
    ///
    /// Returns error if the network connection fails, the request times
    /// out, or the maximum retries are exceeded.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Execute an HTTP request with a custom retry policy
    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        let _ = policy;
        self.execute(request).await
    }

    /// Open a streaming download of `url`.
    ///
    /// A non-success status is an error; the body stream is only returned
    /// for 2xx responses.
    async fn fetch(&self, url: String) -> Result<FetchedBody>;
}
