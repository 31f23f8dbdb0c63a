//! Collection error taxonomy.
//!
//! One enum covers every failure the orchestrator has to route: per-reference
//! failures are recorded and the job continues; `Auth`, `Registry`, and
//! `Config` failures abort the whole job. `error_class()` is the stable
//! string persisted by the registration store, so callers can target retries
//! without parsing messages.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience result type for collection operations.
pub type CollectResult<T> = Result<T, CollectError>;

/// Error type for collection operations.
///
/// Designed to be serializable so adapters and progress consumers can carry
/// it across process boundaries without depending on `std::io::Error` or
/// HTTP client types.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum CollectError {
    /// Invalid or rejected API credential. Fatal for the whole job.
    #[error("Authentication failed: {message}")]
    Auth {
        /// Detailed error message.
        message: String,
    },

    /// A group or replay id does not exist remotely. Fatal for that
    /// reference only.
    #[error("Not found: {what}")]
    NotFound {
        /// What was not found (group id, replay id).
        what: String,
    },

    /// The remote signaled rate exhaustion. Always retried after honoring
    /// the wait hint; never counts toward the permanent-failure ceiling.
    #[error("Rate limited by remote API")]
    RateLimited {
        /// Server-provided wait hint in seconds, if any.
        #[serde(skip_serializing_if = "Option::is_none")]
        retry_after_secs: Option<u64>,
    },

    /// 5xx or network-level failure. Retried with backoff up to a bound.
    #[error("Transient error: {message}")]
    Transient {
        /// Detailed error message.
        message: String,
    },

    /// The remote payload did not match the expected contract. Not retried.
    #[error("Malformed response: {context}")]
    Malformed {
        /// Diagnostic context (endpoint, decode failure).
        context: String,
    },

    /// Storage backend write/read failure. Terminal for that reference.
    #[error("Storage error: {message}")]
    Storage {
        /// Detailed error message.
        message: String,
    },

    /// Registration store failure. Infrastructure-level, aborts the job.
    #[error("Registration store error: {message}")]
    Registry {
        /// Detailed error message.
        message: String,
    },

    /// A group was found on its own ancestor path during expansion.
    /// Terminal for that branch of the tree, not for the job.
    #[error("Cycle detected in group tree at '{group_id}'")]
    CycleDetected {
        /// The group id that closed the cycle.
        group_id: String,
    },

    /// Invalid configuration, caught at construction time.
    #[error("Configuration error: {message}")]
    Config {
        /// What was invalid.
        message: String,
    },

    /// The job was cancelled cooperatively.
    #[error("Collection cancelled")]
    Cancelled,
}

impl CollectError {
    /// Create an auth error.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create a rate-limited error with an optional server wait hint.
    #[must_use]
    pub const fn rate_limited(retry_after_secs: Option<u64>) -> Self {
        Self::RateLimited { retry_after_secs }
    }

    /// Create a transient error.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    /// Create a malformed-response error.
    pub fn malformed(context: impl Into<String>) -> Self {
        Self::Malformed {
            context: context.into(),
        }
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a registration store error.
    pub fn registry(message: impl Into<String>) -> Self {
        Self::Registry {
            message: message.into(),
        }
    }

    /// Create a cycle-detected error.
    pub fn cycle(group_id: impl Into<String>) -> Self {
        Self::CycleDetected {
            group_id: group_id.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Stable class string persisted to the registration store.
    #[must_use]
    pub const fn error_class(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "auth",
            Self::NotFound { .. } => "not_found",
            Self::RateLimited { .. } => "rate_limited",
            Self::Transient { .. } => "transient",
            Self::Malformed { .. } => "malformed",
            Self::Storage { .. } => "storage",
            Self::Registry { .. } => "registry",
            Self::CycleDetected { .. } => "cycle",
            Self::Config { .. } => "config",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether a failed operation may be re-attempted.
    ///
    /// `RateLimited` is retryable but handled separately: it does not consume
    /// the bounded retry budget.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::RateLimited { .. })
    }

    /// Whether this failure aborts the whole job rather than one reference.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Auth { .. } | Self::Registry { .. } | Self::Config { .. }
        )
    }

    /// Whether this is a cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
