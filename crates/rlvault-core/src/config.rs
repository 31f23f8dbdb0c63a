//! Collection configuration values.
//!
//! Values only: how they are loaded (env, CLI, file) is the caller's
//! concern. `validate()` enforces the construction-time invariants so
//! misconfiguration fails fast instead of surfacing mid-job.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CollectError, CollectResult};

/// Default hourly API call ceiling (ballchasing free tier).
pub const DEFAULT_RATE_LIMIT_PER_HOUR: u32 = 200;

/// Default per-second API call spacing.
pub const DEFAULT_RATE_LIMIT_PER_SECOND: u32 = 1;

/// Default download worker concurrency.
///
/// Conservative relative to the rate ceiling: more workers than this mostly
/// queue on the limiter without finishing downloads any faster.
pub const DEFAULT_WORKER_CONCURRENCY: usize = 4;

/// Default permanent-failure attempt ceiling per replay.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Which storage backend to construct and where it writes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageTarget {
    /// Local filesystem rooted at `base_dir`.
    Local {
        /// Directory under which replay keys are materialized.
        base_dir: PathBuf,
    },
    /// S3-compatible object storage.
    S3 {
        /// Bucket name.
        bucket: String,
        /// AWS region.
        region: String,
        /// Optional key prefix inside the bucket.
        prefix: Option<String>,
    },
}

/// Configuration for one collection job.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// ballchasing.com API key.
    pub api_key: String,
    /// Maximum API calls per rolling hour window.
    pub rate_limit_per_hour: u32,
    /// Maximum API calls per second.
    pub rate_limit_per_second: u32,
    /// Bounded worker pool size for concurrent downloads.
    pub worker_concurrency: usize,
    /// Permanent-failure attempt ceiling per replay.
    pub max_attempts: u32,
    /// Storage backend selection and target.
    pub storage: StorageTarget,
    /// Path to the SQLite registration store.
    pub database_path: PathBuf,
}

impl CollectionConfig {
    /// Create a configuration with defaults for everything but the
    /// credential and storage target.
    pub fn new(api_key: impl Into<String>, storage: StorageTarget) -> Self {
        Self {
            api_key: api_key.into(),
            rate_limit_per_hour: DEFAULT_RATE_LIMIT_PER_HOUR,
            rate_limit_per_second: DEFAULT_RATE_LIMIT_PER_SECOND,
            worker_concurrency: DEFAULT_WORKER_CONCURRENCY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            storage,
            database_path: PathBuf::from("./rlvault.db"),
        }
    }

    /// The rolling window the hourly ceiling applies to.
    #[must_use]
    pub const fn rate_window(&self) -> Duration {
        Duration::from_secs(3600)
    }

    /// Validate construction-time invariants.
    ///
    /// A zero rate ceiling or worker count is a configuration error, not a
    /// runtime error: nothing downstream can make progress with either.
    pub fn validate(&self) -> CollectResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(CollectError::config("API key must not be empty"));
        }
        if self.rate_limit_per_hour == 0 {
            return Err(CollectError::config("rate_limit_per_hour must be positive"));
        }
        if self.rate_limit_per_second == 0 {
            return Err(CollectError::config("rate_limit_per_second must be positive"));
        }
        if self.worker_concurrency == 0 {
            return Err(CollectError::config("worker_concurrency must be positive"));
        }
        if self.max_attempts == 0 {
            return Err(CollectError::config("max_attempts must be positive"));
        }
        if let StorageTarget::S3 { bucket, region, .. } = &self.storage {
            if bucket.is_empty() {
                return Err(CollectError::config("S3 bucket must not be empty"));
            }
            if region.is_empty() {
                return Err(CollectError::config("S3 region must not be empty"));
            }
        }
        Ok(())
    }
}
