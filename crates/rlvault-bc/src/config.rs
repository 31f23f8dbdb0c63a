//! Client tuning knobs.

use serde::{Deserialize, Serialize};

use crate::endpoints::DEFAULT_BASE_URL;

/// Page size requested from listing endpoints, the API maximum.
pub const DEFAULT_PAGE_SIZE: u32 = 200;

/// Configuration for the ballchasing API client.
///
/// The API key and rate limits live in `CollectionConfig`; this covers the
/// HTTP-level knobs only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BcConfig {
    /// Base URL of the API, overridable for test servers.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Retries for transient failures per logical call.
    pub max_retries: u8,
    /// Base delay for exponential retry backoff.
    pub retry_base_delay_ms: u64,
    /// Items requested per listing page.
    pub page_size: u32,
}

impl Default for BcConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            max_retries: 3,
            retry_base_delay_ms: 500,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}
