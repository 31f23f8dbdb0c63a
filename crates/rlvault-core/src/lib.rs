//! Core domain types and port definitions for rlvault.
//!
//! This crate holds pure data types, the error taxonomy, configuration
//! values, and the port traits the adapter crates implement. It has no
//! network, filesystem, or database dependencies.

pub mod config;
pub mod domain;
pub mod error;
pub mod ports;

// Re-export commonly used types for convenience
pub use config::{
    CollectionConfig, DEFAULT_MAX_ATTEMPTS, DEFAULT_RATE_LIMIT_PER_HOUR,
    DEFAULT_RATE_LIMIT_PER_SECOND, DEFAULT_WORKER_CONCURRENCY, StorageTarget,
};
pub use domain::{
    DownloadRecord, DownloadStatus, FailedReplay, Group, GroupId, JobResult, RateBudget,
    RegistrationStats, ReplayId, ReplayReference, sanitize_path_component,
};
pub use error::{CollectError, CollectResult};
pub use ports::{
    ApiClientPort, RegistrationStorePort, ReplayByteStream, ReplayParserPort, StorageBackendPort,
    StorageStats, WrittenObject,
};

// Silence unused dev-dependency warnings until we add runtime-based tests here
#[cfg(test)]
use tokio as _;
#[cfg(test)]
use tokio_test as _;
