//! HTTP backend abstraction for the ballchasing API.
//!
//! The backend performs exactly one attempt per call and classifies the
//! outcome into the collection error taxonomy; the retry and rate-limit
//! policy lives in the client on top of it. Splitting it this way keeps
//! the policy testable against a fake backend without real sockets.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use rlvault_core::{CollectError, CollectResult, ReplayByteStream};

/// Trait for HTTP backends that can fetch JSON and byte streams.
///
/// This is an implementation detail; external code should use the
/// `ApiClientPort` trait.
#[async_trait]
pub trait HttpBackend: Send + Sync {
    /// Fetch JSON from a URL and deserialize it. One attempt, no retry.
    async fn get_json<T: DeserializeOwned + Send>(&self, url: &Url) -> CollectResult<T>;

    /// Open a byte stream from a URL. One attempt, no retry; errors after
    /// the stream is open surface through the stream items.
    async fn get_stream(&self, url: &Url) -> CollectResult<ReplayByteStream>;
}

/// Classify a non-success HTTP status into the error taxonomy.
fn classify_status(status: StatusCode, url: &Url, retry_after: Option<u64>) -> CollectError {
    match status.as_u16() {
        401 | 403 => CollectError::auth(format!("API key rejected ({status})")),
        404 => CollectError::not_found(url.path().trim_start_matches("/api/").to_string()),
        429 => CollectError::rate_limited(retry_after),
        s if status.is_server_error() => {
            CollectError::transient(format!("server error {s} from {url}"))
        }
        s => CollectError::malformed(format!("unexpected status {s} from {url}")),
    }
}

/// Parse a Retry-After header value as whole seconds.
///
/// HTTP-date values are rare from this API and are ignored rather than
/// parsed; the caller then falls back to its default backoff.
fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Production HTTP backend using reqwest.
///
/// Sends the API key verbatim in the `Authorization` header, which is the
/// scheme the ballchasing API uses (no `Bearer` prefix).
pub struct ReqwestBackend {
    client: reqwest::Client,
    api_key: String,
}

impl ReqwestBackend {
    /// Create a backend with the given API key and request timeout.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> CollectResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CollectError::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
        })
    }

    async fn send(&self, url: &Url) -> CollectResult<reqwest::Response> {
        let response = self
            .client
            .get(url.as_str())
            .header("Authorization", &self.api_key)
            .send()
            .await
            .map_err(|e| CollectError::transient(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let retry_after = parse_retry_after(response.headers());
        Err(classify_status(status, url, retry_after))
    }
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn get_json<T: DeserializeOwned + Send>(&self, url: &Url) -> CollectResult<T> {
        let response = self.send(url).await?;
        let endpoint = url.path().to_string();
        response
            .json()
            .await
            .map_err(|e| CollectError::malformed(format!("decoding {endpoint}: {e}")))
    }

    async fn get_stream(&self, url: &Url) -> CollectResult<ReplayByteStream> {
        let response = self.send(url).await?;
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| CollectError::transient(format!("stream error: {e}"))));
        Ok(Box::pin(stream))
    }
}

// ============================================================================
// Fake Backend for Testing
// ============================================================================
