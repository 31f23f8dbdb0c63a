//! ballchasing.com API adapter for rlvault.
//!
//! Implements the `ApiClientPort` from `rlvault-core` over HTTP, with a
//! shared global rate limiter, transparent pagination, and retry handling
//! for transient and rate-limited failures.

pub mod client;
pub mod config;
pub mod endpoints;
pub mod http;
pub mod limiter;
pub mod models;

pub use client::BcApiClient;
pub use config::{BcConfig, DEFAULT_PAGE_SIZE};
pub use http::{HttpBackend, ReqwestBackend};
pub use limiter::RateLimiter;

// Dev-dependencies exercised only inside unit tests
#[cfg(test)]
use tokio_test as _;
