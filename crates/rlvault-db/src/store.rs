//! `SQLite` implementation of the `RegistrationStorePort` trait.
//!
//! Every transition is a single UPDATE with the status guard in the WHERE
//! clause, so "completed is terminal" is enforced by the database itself
//! rather than by read-modify-write code paths. Records are never deleted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use rlvault_core::{
    CollectError, CollectResult, DownloadRecord, DownloadStatus, Group, GroupId, RateBudget,
    RegistrationStats, RegistrationStorePort, ReplayId, ReplayReference,
};

/// Key in `meta_kv` under which the rate-budget snapshot is stored.
const RATE_BUDGET_KEY: &str = "rate_budget";

/// `SQLite` registration ledger.
///
/// Cheap to clone; the pool is reference counted.
#[derive(Clone)]
pub struct SqliteRegistrationStore {
    pool: SqlitePool,
}

impl SqliteRegistrationStore {
    /// Create a store over an initialized pool (see `setup_database`).
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn db_error(e: sqlx::Error) -> CollectError {
    CollectError::registry(e.to_string())
}

#[async_trait]
impl RegistrationStorePort for SqliteRegistrationStore {
    async fn register(&self, reference: &ReplayReference) -> CollectResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO replays (replay_id, group_id, status, first_seen_at)
            VALUES (?, ?, 'pending', ?)
            ON CONFLICT(replay_id) DO NOTHING
            "#,
        )
        .bind(reference.id.as_str())
        .bind(reference.group_id.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        let created = result.rows_affected() == 1;
        if created {
            debug!(id = %reference.id, group = %reference.group_id, "registered replay");
        }
        Ok(created)
    }

    async fn is_completed(&self, id: &ReplayId) -> CollectResult<bool> {
        let status: Option<(String,)> =
            sqlx::query_as("SELECT status FROM replays WHERE replay_id = ?")
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

        Ok(status.is_some_and(|(s,)| DownloadStatus::parse(&s) == DownloadStatus::Completed))
    }

    async fn mark_in_progress(&self, id: &ReplayId) -> CollectResult<()> {
        sqlx::query(
            r#"
            UPDATE replays
            SET status = 'in_progress',
                attempt_count = attempt_count + 1,
                last_attempt_at = ?
            WHERE replay_id = ? AND status != 'completed'
            "#,
        )
        .bind(Utc::now())
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn mark_completed(
        &self,
        id: &ReplayId,
        location: &str,
        size_bytes: u64,
    ) -> CollectResult<()> {
        sqlx::query(
            r#"
            UPDATE replays
            SET status = 'completed',
                storage_key = ?,
                file_size_bytes = ?,
                last_error_class = NULL,
                last_error = NULL,
                last_attempt_at = ?
            WHERE replay_id = ?
            "#,
        )
        .bind(location)
        .bind(i64::try_from(size_bytes).unwrap_or(i64::MAX))
        .bind(Utc::now())
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn mark_failed(&self, id: &ReplayId, error_class: &str, message: &str) -> CollectResult<()> {
        sqlx::query(
            r#"
            UPDATE replays
            SET status = 'failed',
                last_error_class = ?,
                last_error = ?,
                last_attempt_at = ?
            WHERE replay_id = ? AND status != 'completed'
            "#,
        )
        .bind(error_class)
        .bind(message)
        .bind(Utc::now())
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn release_in_progress(&self, id: &ReplayId) -> CollectResult<()> {
        sqlx::query(
            r#"
            UPDATE replays
            SET status = 'pending'
            WHERE replay_id = ? AND status = 'in_progress'
            "#,
        )
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn pending_for_group(&self, group_id: &GroupId) -> CollectResult<Vec<ReplayId>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT replay_id FROM replays
            WHERE group_id = ? AND status != 'completed'
            ORDER BY first_seen_at ASC
            "#,
        )
        .bind(group_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(|(id,)| ReplayId::from(id)).collect())
    }

    async fn get_record(&self, id: &ReplayId) -> CollectResult<Option<DownloadRecord>> {
        let row = sqlx::query(
            r#"
            SELECT replay_id, group_id, status, storage_key, file_size_bytes,
                   attempt_count, last_error_class, last_error,
                   first_seen_at, last_attempt_at
            FROM replays
            WHERE replay_id = ?
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn record_group_sync(&self, group: &Group, replay_count: u64) -> CollectResult<()> {
        sqlx::query(
            r#"
            INSERT INTO groups (group_id, name, parent_id, replay_count, last_synced_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(group_id) DO UPDATE SET
                name = excluded.name,
                parent_id = excluded.parent_id,
                replay_count = excluded.replay_count,
                last_synced_at = excluded.last_synced_at
            "#,
        )
        .bind(group.id.as_str())
        .bind(&group.name)
        .bind(group.parent.as_ref().map(GroupId::as_str))
        .bind(i64::try_from(replay_count).unwrap_or(i64::MAX))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn load_rate_budget(&self) -> CollectResult<Option<RateBudget>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM meta_kv WHERE key = ?")
            .bind(RATE_BUDGET_KEY)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        // A corrupt snapshot is dropped rather than failing the job; the
        // limiter then starts a fresh window, which only slows us down
        Ok(row.and_then(|(json,)| serde_json::from_str(&json).ok()))
    }

    async fn save_rate_budget(&self, budget: &RateBudget) -> CollectResult<()> {
        let json = serde_json::to_string(budget)
            .map_err(|e| CollectError::registry(format!("encoding rate budget: {e}")))?;
        sqlx::query(
            r#"
            INSERT INTO meta_kv (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(RATE_BUDGET_KEY)
        .bind(json)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn stats(&self) -> CollectResult<RegistrationStats> {
        let rows: Vec<(String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT status, COUNT(*), COALESCE(SUM(file_size_bytes), 0)
            FROM replays
            GROUP BY status
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let mut stats = RegistrationStats::default();
        for (status, count, bytes) in rows {
            let count = u64::try_from(count).unwrap_or(0);
            match DownloadStatus::parse(&status) {
                DownloadStatus::Completed => {
                    stats.completed = count;
                    stats.total_bytes = u64::try_from(bytes).unwrap_or(0);
                }
                DownloadStatus::Failed => stats.failed = count,
                DownloadStatus::InProgress => stats.in_progress = count,
                DownloadStatus::Pending => stats.pending += count,
            }
            stats.total += count;
        }
        Ok(stats)
    }
}

/// Convert a database row to a `DownloadRecord`.
fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> CollectResult<DownloadRecord> {
    use sqlx::Row;

    let get = |e: sqlx::Error| CollectError::registry(format!("column read error: {e}"));

    let replay_id: String = row.try_get("replay_id").map_err(get)?;
    let group_id: String = row.try_get("group_id").map_err(get)?;
    let status: String = row.try_get("status").map_err(get)?;
    let storage_key: Option<String> = row.try_get("storage_key").map_err(get)?;
    let file_size_bytes: Option<i64> = row.try_get("file_size_bytes").map_err(get)?;
    let attempt_count: i64 = row.try_get("attempt_count").map_err(get)?;
    let last_error_class: Option<String> = row.try_get("last_error_class").map_err(get)?;
    let last_error: Option<String> = row.try_get("last_error").map_err(get)?;
    let first_seen_at: DateTime<Utc> = row.try_get("first_seen_at").map_err(get)?;
    let last_attempt_at: Option<DateTime<Utc>> = row.try_get("last_attempt_at").map_err(get)?;

    Ok(DownloadRecord {
        replay_id: ReplayId::from(replay_id),
        group_id: GroupId::from(group_id),
        status: DownloadStatus::parse(&status),
        storage_key,
        file_size_bytes: file_size_bytes.map(|b| u64::try_from(b).unwrap_or(0)),
        attempt_count: u32::try_from(attempt_count).unwrap_or(0),
        last_error_class,
        last_error,
        first_seen_at,
        last_attempt_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::setup_test_database;
    use rlvault_core::ReplayReference;

    async fn store() -> SqliteRegistrationStore {
        SqliteRegistrationStore::new(setup_test_database().await.unwrap())
    }

    fn reference(id: &str, group: &str) -> ReplayReference {
        ReplayReference::new(id, group)
    }

    #[tokio::test]
    async fn register_creates_once() {
        let store = store().await;
        assert!(store.register(&reference("r1", "g1")).await.unwrap());
        assert!(!store.register(&reference("r1", "g1")).await.unwrap());

        let record = store
            .get_record(&ReplayId::from("r1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, DownloadStatus::Pending);
        assert_eq!(record.attempt_count, 0);
    }

    #[tokio::test]
    async fn lifecycle_transitions() {
        let store = store().await;
        let id = ReplayId::from("r1");
        store.register(&reference("r1", "g1")).await.unwrap();

        store.mark_in_progress(&id).await.unwrap();
        let record = store.get_record(&id).await.unwrap().unwrap();
        assert_eq!(record.status, DownloadStatus::InProgress);
        assert_eq!(record.attempt_count, 1);
        assert!(record.last_attempt_at.is_some());

        store.mark_completed(&id, "g1/r1.replay", 2048).await.unwrap();
        assert!(store.is_completed(&id).await.unwrap());
        let record = store.get_record(&id).await.unwrap().unwrap();
        assert_eq!(record.storage_key.as_deref(), Some("g1/r1.replay"));
        assert_eq!(record.file_size_bytes, Some(2048));
    }

    #[tokio::test]
    async fn completed_is_terminal() {
        let store = store().await;
        let id = ReplayId::from("r1");
        store.register(&reference("r1", "g1")).await.unwrap();
        store.mark_completed(&id, "g1/r1.replay", 100).await.unwrap();

        // None of these may move the record out of completed
        store.mark_in_progress(&id).await.unwrap();
        store.mark_failed(&id, "transient", "boom").await.unwrap();
        store.release_in_progress(&id).await.unwrap();

        let record = store.get_record(&id).await.unwrap().unwrap();
        assert_eq!(record.status, DownloadStatus::Completed);
        assert_eq!(record.attempt_count, 0);
        assert!(record.last_error.is_none());
    }

    #[tokio::test]
    async fn failed_records_keep_error_class() {
        let store = store().await;
        let id = ReplayId::from("r1");
        store.register(&reference("r1", "g1")).await.unwrap();
        store.mark_in_progress(&id).await.unwrap();
        store
            .mark_failed(&id, "transient", "server error 503")
            .await
            .unwrap();

        let record = store.get_record(&id).await.unwrap().unwrap();
        assert_eq!(record.status, DownloadStatus::Failed);
        assert_eq!(record.last_error_class.as_deref(), Some("transient"));
        assert_eq!(record.last_error.as_deref(), Some("server error 503"));
    }

    #[tokio::test]
    async fn release_downgrades_only_in_progress() {
        let store = store().await;
        let id = ReplayId::from("r1");
        store.register(&reference("r1", "g1")).await.unwrap();

        store.mark_in_progress(&id).await.unwrap();
        store.release_in_progress(&id).await.unwrap();
        let record = store.get_record(&id).await.unwrap().unwrap();
        assert_eq!(record.status, DownloadStatus::Pending);
        // Attempt count is history and survives the downgrade
        assert_eq!(record.attempt_count, 1);

        store.mark_failed(&id, "storage", "disk full").await.unwrap();
        store.release_in_progress(&id).await.unwrap();
        let record = store.get_record(&id).await.unwrap().unwrap();
        assert_eq!(record.status, DownloadStatus::Failed);
    }

    #[tokio::test]
    async fn pending_for_group_excludes_completed() {
        let store = store().await;
        store.register(&reference("r1", "g1")).await.unwrap();
        store.register(&reference("r2", "g1")).await.unwrap();
        store.register(&reference("r3", "g1")).await.unwrap();
        store.register(&reference("other", "g2")).await.unwrap();

        store
            .mark_completed(&ReplayId::from("r2"), "g1/r2.replay", 1)
            .await
            .unwrap();
        store
            .mark_failed(&ReplayId::from("r3"), "transient", "503")
            .await
            .unwrap();

        let pending = store.pending_for_group(&GroupId::from("g1")).await.unwrap();
        assert_eq!(
            pending,
            vec![ReplayId::from("r1"), ReplayId::from("r3")]
        );
    }

    #[tokio::test]
    async fn group_sync_upserts() {
        let store = store().await;
        let group = Group::new("g1", "RLCS Worlds");
        store.record_group_sync(&group, 10).await.unwrap();
        store.record_group_sync(&group, 12).await.unwrap();

        let row: (i64,) = sqlx::query_as("SELECT replay_count FROM groups WHERE group_id = 'g1'")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(row.0, 12);
    }

    #[tokio::test]
    async fn rate_budget_round_trips() {
        let store = store().await;
        assert!(store.load_rate_budget().await.unwrap().is_none());

        let budget = RateBudget {
            window_start: Utc::now(),
            consumed: 42,
            ceiling: 200,
        };
        store.save_rate_budget(&budget).await.unwrap();
        assert_eq!(store.load_rate_budget().await.unwrap(), Some(budget));
    }

    #[tokio::test]
    async fn stats_aggregate_by_status() {
        let store = store().await;
        store.register(&reference("r1", "g1")).await.unwrap();
        store.register(&reference("r2", "g1")).await.unwrap();
        store.register(&reference("r3", "g1")).await.unwrap();

        store
            .mark_completed(&ReplayId::from("r1"), "k1", 100)
            .await
            .unwrap();
        store
            .mark_completed(&ReplayId::from("r2"), "k2", 150)
            .await
            .unwrap();
        store
            .mark_failed(&ReplayId::from("r3"), "not_found", "404")
            .await
            .unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.pending, 0);
        assert_eq!(stats.total_bytes, 250);
    }
}
