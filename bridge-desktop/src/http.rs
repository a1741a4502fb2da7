//! Reqwest-backed [`HttpClient`].
//!
//! One pooled client serves the trigger call, the manifest fetch, and
//! every asset download. Buffered requests go through the retry loop;
//! streaming fetches bypass it so a half-read body is never retried
//! transparently.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{FetchedBody, HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy},
};
use futures_util::TryStreamExt;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client over a pooled `reqwest::Client`.
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_max_idle_per_host(10)
            .user_agent("drive-asset-sync/0.1.0")
            .build()
            .expect("Failed to build HTTP client");

        Self { client }
    }

    /// Wrap an externally configured `reqwest::Client`.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn to_builder(&self, request: &HttpRequest) -> reqwest::RequestBuilder {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Head => reqwest::Method::HEAD,
        };

        let mut builder = self.client.request(method, &request.url);
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        builder
    }

    /// Server overload and rate limiting are worth retrying; everything
    /// else is returned to the caller as-is.
    fn retryable(status: u16) -> bool {
        status >= 500 || status == 429
    }

    fn backoff(policy: &RetryPolicy, attempt: u32) -> Duration {
        if policy.use_exponential_backoff {
            (policy.base_delay * 2u32.pow(attempt)).min(policy.max_delay)
        } else {
            policy.base_delay
        }
    }

    async fn into_response(response: reqwest::Response) -> Result<HttpResponse> {
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Body read failed: {}", e)))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    fn classify(e: reqwest::Error) -> BridgeError {
        if e.is_timeout() {
            BridgeError::OperationFailed("Request timed out".to_string())
        } else if e.is_connect() {
            BridgeError::OperationFailed(format!("Connection failed: {}", e))
        } else {
            BridgeError::OperationFailed(e.to_string())
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.execute_with_retry(request, RetryPolicy::default())
            .await
    }

    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        let mut last_error = None;

        for attempt in 0..policy.max_attempts {
            debug!(
                attempt = attempt + 1,
                max_attempts = policy.max_attempts,
                url = %request.url,
                "Executing HTTP request"
            );

            match self.to_builder(&request).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if !Self::retryable(status) {
                        return Self::into_response(response).await;
                    }
                    warn!(status, attempt = attempt + 1, "Retryable HTTP status");
                    last_error = Some(BridgeError::Status {
                        status,
                        message: format!("HTTP {} error", status),
                    });
                }
                Err(e) => {
                    warn!(error = %e, attempt = attempt + 1, "HTTP request failed");
                    last_error = Some(Self::classify(e));
                }
            }

            if attempt + 1 < policy.max_attempts {
                let delay = Self::backoff(&policy, attempt);
                debug!(delay_ms = delay.as_millis(), "Retrying after delay");
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            BridgeError::OperationFailed("All retry attempts exhausted".to_string())
        }))
    }

    async fn fetch(&self, url: String) -> Result<FetchedBody> {
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(Self::classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::Status {
                status: status.as_u16(),
                message: format!("HTTP error: {}", status),
            });
        }

        let content_length = response.content_length();
        let reader = tokio_util::io::StreamReader::new(
            response.bytes_stream().map_err(std::io::Error::other),
        );

        Ok(FetchedBody {
            content_length,
            reader: Box::new(reader),
        })
    }
}
