//! Registration store port.
//!
//! The durable per-replay status ledger that makes deduplication and
//! resumption work. Implemented by `rlvault-db` over SQLite.
//!
//! # Persistence scope
//!
//! - One record per replay id, created on first sighting, never deleted
//! - Transitions are single atomic statements; different ids never block
//!   each other, same-id transitions serialize (last writer wins)
//! - `Completed` is terminal: no transition may move a completed record
//!   back, which is the idempotence guarantee the whole system exists for

use async_trait::async_trait;

use crate::domain::{
    DownloadRecord, Group, GroupId, RateBudget, RegistrationStats, ReplayId, ReplayReference,
};
use crate::error::CollectResult;

/// Port for the durable replay registration ledger.
#[async_trait]
pub trait RegistrationStorePort: Send + Sync {
    /// Register a reference on first sighting.
    ///
    /// Returns `true` if a new record was created, `false` if the id was
    /// already known (existing records are left untouched).
    async fn register(&self, reference: &ReplayReference) -> CollectResult<bool>;

    /// True only if a prior run recorded `Completed` for this id.
    async fn is_completed(&self, id: &ReplayId) -> CollectResult<bool>;

    /// Transition a record to `InProgress`, incrementing its attempt count.
    /// No-op for completed records.
    async fn mark_in_progress(&self, id: &ReplayId) -> CollectResult<()>;

    /// Transition a record to `Completed` with its storage location.
    async fn mark_completed(
        &self,
        id: &ReplayId,
        location: &str,
        size_bytes: u64,
    ) -> CollectResult<()>;

    /// Transition a record to `Failed` with the classified error.
    /// No-op for completed records.
    async fn mark_failed(
        &self,
        id: &ReplayId,
        error_class: &str,
        message: &str,
    ) -> CollectResult<()>;

    /// Downgrade an `InProgress` record back to `Pending`.
    ///
    /// Called on clean shutdown for items a worker did not finish, so an
    /// interrupted job never leaves records stuck in `InProgress`.
    async fn release_in_progress(&self, id: &ReplayId) -> CollectResult<()>;

    /// Ids registered under the given group that are still resumable
    /// (`Pending`, `InProgress`, or `Failed`).
    async fn pending_for_group(&self, group_id: &GroupId) -> CollectResult<Vec<ReplayId>>;

    /// Fetch the full record for an id, if one exists.
    async fn get_record(&self, id: &ReplayId) -> CollectResult<Option<DownloadRecord>>;

    /// Record that a group was synced with the number of replays seen.
    async fn record_group_sync(&self, group: &Group, replay_count: u64) -> CollectResult<()>;

    /// Load the persisted rate-budget snapshot, if any.
    async fn load_rate_budget(&self) -> CollectResult<Option<RateBudget>>;

    /// Persist the current rate-budget snapshot (best effort durability).
    async fn save_rate_budget(&self, budget: &RateBudget) -> CollectResult<()>;

    /// Aggregate counts over the whole store.
    async fn stats(&self) -> CollectResult<RegistrationStats>;
}
