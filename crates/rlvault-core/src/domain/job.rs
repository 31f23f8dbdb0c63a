//! Job-level aggregates: rate budget and collection results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::replay::ReplayId;

/// Snapshot of rate-limiter consumption for the current window.
///
/// Persisted (best effort) so a restarted job does not immediately re-burst
/// the remote API past its ceiling. When no snapshot is available the window
/// restarts empty, which is the conservative direction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateBudget {
    /// Start of the current rolling window.
    pub window_start: DateTime<Utc>,
    /// Tokens consumed since `window_start`.
    pub consumed: u32,
    /// Configured ceiling per window.
    pub ceiling: u32,
}

impl RateBudget {
    /// A fresh budget starting now with nothing consumed.
    #[must_use]
    pub fn fresh(ceiling: u32) -> Self {
        Self {
            window_start: Utc::now(),
            consumed: 0,
            ceiling,
        }
    }

    /// Remaining tokens in the window, saturating at zero.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.ceiling.saturating_sub(self.consumed)
    }
}

/// A single failed replay with its classified error, for targeted retries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedReplay {
    /// The replay that failed.
    pub replay_id: ReplayId,
    /// Stable error class (see `CollectError::error_class`).
    pub error_class: String,
    /// Human-readable error message.
    pub message: String,
}

/// Summary of one orchestrator invocation. Immutable once produced.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    /// References dispatched to workers (excludes skipped).
    pub attempted: u64,
    /// Downloads that completed and were registered.
    pub succeeded: u64,
    /// Downloads that exhausted their retries or failed terminally.
    pub failed: u64,
    /// References skipped because the store already marked them completed.
    pub skipped: u64,
    /// Total bytes written to storage by this invocation.
    pub total_bytes: u64,
    /// Whether the job stopped early on a cancellation signal.
    pub cancelled: bool,
    /// Every failed id with its error class.
    pub failures: Vec<FailedReplay>,
}

impl JobResult {
    /// Total references the job saw (attempted plus skipped).
    #[must_use]
    pub const fn total_seen(&self) -> u64 {
        self.attempted + self.skipped
    }
}
