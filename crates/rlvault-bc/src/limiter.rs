//! Global rate limiter for remote API calls.
//!
//! Every request the client makes passes through [`RateLimiter::acquire`],
//! which enforces three constraints at once:
//!
//! - a hard per-window ceiling (e.g. 200 calls per hour),
//! - minimum spacing between consecutive calls (e.g. 1 per second),
//! - any server-issued wait hint from a 429 response.
//!
//! `acquire` never fails; it waits as long as needed. Misconfiguration
//! (a zero ceiling) is rejected at construction instead, so a job can
//! never stall forever waiting for a token that cannot exist.

use chrono::{DateTime, Utc};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use rlvault_core::{CollectError, CollectResult, RateBudget};

/// Length of the rate window, one hour.
pub const WINDOW: Duration = Duration::from_secs(3600);

#[derive(Debug)]
struct LimiterState {
    /// Monotonic start of the current window.
    window_started: Instant,
    /// Wall-clock start of the current window, for persisted snapshots.
    window_started_utc: DateTime<Utc>,
    /// Grants handed out since the window started.
    consumed: u32,
    /// When the previous grant was handed out.
    last_grant: Option<Instant>,
    /// Earliest instant the next grant may happen, set from Retry-After.
    not_before: Option<Instant>,
}

/// Shared token source for all remote API calls.
///
/// Cheap to share behind an `Arc`; the critical section is a short
/// non-async mutex so concurrent acquirers serialize without holding
/// the lock across sleeps.
#[derive(Debug)]
pub struct RateLimiter {
    ceiling: u32,
    window: Duration,
    min_interval: Duration,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    /// Create a limiter with an hourly ceiling and a per-second pace.
    ///
    /// Fails with `CollectError::Config` when either limit is zero.
    pub fn new(per_hour: u32, per_second: u32) -> CollectResult<Self> {
        Self::with_window(per_hour, per_second, WINDOW)
    }

    /// Create a limiter with an explicit window length.
    pub fn with_window(ceiling: u32, per_second: u32, window: Duration) -> CollectResult<Self> {
        if ceiling == 0 {
            return Err(CollectError::config("rate limit ceiling must be positive"));
        }
        if per_second == 0 {
            return Err(CollectError::config("per-second rate must be positive"));
        }
        Ok(Self {
            ceiling,
            window,
            min_interval: Duration::from_secs_f64(1.0 / f64::from(per_second)),
            state: Mutex::new(LimiterState {
                window_started: Instant::now(),
                window_started_utc: Utc::now(),
                consumed: 0,
                last_grant: None,
                not_before: None,
            }),
        })
    }

    /// Restore consumption from a persisted budget snapshot.
    ///
    /// Only applied when the snapshot's window is still current; a stale
    /// snapshot is ignored and the window restarts empty.
    pub fn restore(&self, budget: &RateBudget) {
        let elapsed = Utc::now().signed_duration_since(budget.window_start);
        let Ok(elapsed) = elapsed.to_std() else {
            return; // snapshot from the future, ignore
        };
        if elapsed >= self.window {
            return;
        }
        let mut state = self.state.lock().expect("limiter lock poisoned");
        state.consumed = budget.consumed.min(self.ceiling);
        state.window_started_utc = budget.window_start;
        state.window_started = Instant::now()
            .checked_sub(elapsed)
            .unwrap_or_else(Instant::now);
    }

    /// Wait until one API call is allowed, then consume a token.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().expect("limiter lock poisoned");
                let now = Instant::now();

                if now.duration_since(state.window_started) >= self.window {
                    state.window_started = now;
                    state.window_started_utc = Utc::now();
                    state.consumed = 0;
                }

                let mut wait = Duration::ZERO;
                if let Some(not_before) = state.not_before {
                    wait = wait.max(not_before.duration_since(now));
                }
                if state.consumed >= self.ceiling {
                    let window_end = state.window_started + self.window;
                    wait = wait.max(window_end.duration_since(now));
                }
                if let Some(last) = state.last_grant {
                    wait = wait.max((last + self.min_interval).duration_since(now));
                }

                if wait.is_zero() {
                    state.consumed += 1;
                    state.last_grant = Some(now);
                    state.not_before = None;
                    return;
                }
                wait
            };
            tokio::time::sleep(wait).await;
        }
    }

    /// Record a server wait hint from a 429 response.
    ///
    /// The next grant will not happen before the hint elapses, regardless
    /// of remaining window budget.
    pub fn note_retry_after(&self, secs: u64) {
        let target = Instant::now() + Duration::from_secs(secs);
        let mut state = self.state.lock().expect("limiter lock poisoned");
        state.not_before = Some(match state.not_before {
            Some(existing) if existing > target => existing,
            _ => target,
        });
    }

    /// Snapshot the current window for persistence.
    pub fn budget(&self) -> RateBudget {
        let state = self.state.lock().expect("limiter lock poisoned");
        RateBudget {
            window_start: state.window_started_utc,
            consumed: state.consumed,
            ceiling: self.ceiling,
        }
    }
}
