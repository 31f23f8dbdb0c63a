//! Durable per-replay download records.
//!
//! One record exists per replay id, owned exclusively by the registration
//! store. Records are created on first sighting of a reference, mutated only
//! through orchestrator-issued transitions, and never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::group::GroupId;
use super::replay::ReplayId;

/// Lifecycle state of a replay download.
///
/// `Pending -> InProgress -> {Completed | Failed}`. `Completed` is terminal:
/// re-runs must skip the id entirely. `Failed` may be retried until the
/// attempt ceiling is reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl DownloadStatus {
    /// Stable string form persisted to the registration store.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parse the persisted string form. Unknown values map to `Pending`,
    /// which is the safe direction: the worst outcome is a re-download.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "in_progress" => Self::InProgress,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }

    /// Whether this status represents unfinished work a resumed job should
    /// pick up again.
    #[must_use]
    pub const fn is_resumable(self) -> bool {
        matches!(self, Self::Pending | Self::InProgress | Self::Failed)
    }
}

/// Durable record of a replay's processing state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRecord {
    /// Replay identifier (primary key).
    pub replay_id: ReplayId,
    /// Group the replay was first registered under.
    pub group_id: GroupId,
    /// Current lifecycle state.
    pub status: DownloadStatus,
    /// Storage location, set once completed.
    pub storage_key: Option<String>,
    /// Stored file size in bytes, set once completed.
    pub file_size_bytes: Option<u64>,
    /// Number of `InProgress` transitions issued for this record.
    pub attempt_count: u32,
    /// Stable error class of the last failure, if any.
    pub last_error_class: Option<String>,
    /// Human-readable message of the last failure, if any.
    pub last_error: Option<String>,
    /// When the record was first created.
    pub first_seen_at: DateTime<Utc>,
    /// When the last transition was issued.
    pub last_attempt_at: Option<DateTime<Utc>>,
}

/// Aggregate counts over the registration store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationStats {
    /// Total records in the store.
    pub total: u64,
    /// Records in `Completed` state.
    pub completed: u64,
    /// Records in `Failed` state.
    pub failed: u64,
    /// Records in `Pending` state.
    pub pending: u64,
    /// Records in `InProgress` state.
    pub in_progress: u64,
    /// Sum of stored bytes across completed records.
    pub total_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_string_round_trip() {
        for status in [
            DownloadStatus::Pending,
            DownloadStatus::InProgress,
            DownloadStatus::Completed,
            DownloadStatus::Failed,
        ] {
            assert_eq!(DownloadStatus::parse(status.as_str()), status);
        }
    }

    #[test]
    fn unknown_status_parses_as_pending() {
        assert_eq!(DownloadStatus::parse("garbage"), DownloadStatus::Pending);
    }

    #[test]
    fn completed_is_not_resumable() {
        assert!(!DownloadStatus::Completed.is_resumable());
        assert!(DownloadStatus::InProgress.is_resumable());
        assert!(DownloadStatus::Failed.is_resumable());
    }
}
