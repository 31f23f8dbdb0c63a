//! Database setup and initialization.
//!
//! Provides `setup_database()` for opening (and creating, if missing) the
//! `SQLite` registration ledger with its full schema. The schema is created
//! with IF NOT EXISTS throughout, so setup is safe to run on every start.

use sqlx::{sqlite::SqliteConnectOptions, SqlitePool};
use std::path::Path;

use rlvault_core::{CollectError, CollectResult};

/// Opens the `SQLite` registration database and ensures the schema exists.
///
/// Creates the database file and its parent directory if missing.
///
/// # Errors
///
/// Returns `CollectError::Registry` if the file cannot be opened or the
/// schema cannot be created.
pub async fn setup_database(db_path: &Path) -> CollectResult<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| CollectError::registry(format!("creating database directory: {e}")))?;
    }

    let pool = SqlitePool::connect_with(
        SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true),
    )
    .await
    .map_err(|e| CollectError::registry(format!("opening database: {e}")))?;

    create_schema(&pool).await?;
    Ok(pool)
}

/// Sets up an in-memory `SQLite` database with the production schema.
#[cfg(any(test, feature = "test-utils"))]
pub async fn setup_test_database() -> CollectResult<SqlitePool> {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .map_err(|e| CollectError::registry(format!("opening in-memory database: {e}")))?;
    create_schema(&pool).await?;
    Ok(pool)
}

/// Creates all tables and indexes. Safe to call multiple times.
async fn create_schema(pool: &SqlitePool) -> CollectResult<()> {
    // One row per replay id, never deleted. The CHECK constraint keeps
    // garbage states out of the ledger even under manual edits.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS replays (
            replay_id TEXT PRIMARY KEY NOT NULL,
            group_id TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK(status IN ('pending', 'in_progress', 'completed', 'failed')),
            storage_key TEXT,
            file_size_bytes INTEGER,
            attempt_count INTEGER NOT NULL DEFAULT 0,
            last_error_class TEXT,
            last_error TEXT,
            first_seen_at TEXT NOT NULL,
            last_attempt_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(schema_error)?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_replays_group ON replays(group_id)")
        .execute(pool)
        .await
        .map_err(schema_error)?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_replays_status ON replays(status)")
        .execute(pool)
        .await
        .map_err(schema_error)?;

    // Sync history per group, used for reporting and incremental runs
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS groups (
            group_id TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            parent_id TEXT,
            replay_count INTEGER NOT NULL DEFAULT 0,
            last_synced_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(schema_error)?;

    // Small KV side-table, currently holding the rate-budget snapshot
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meta_kv (
            key TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(schema_error)?;

    Ok(())
}

fn schema_error(e: sqlx::Error) -> CollectError {
    CollectError::registry(format!("creating schema: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_database_has_all_tables() {
        let pool = setup_test_database().await.unwrap();

        let _: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM replays")
            .fetch_one(&pool)
            .await
            .unwrap();
        let _: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM groups")
            .fetch_one(&pool)
            .await
            .unwrap();
        let _: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM meta_kv")
            .fetch_one(&pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn file_database_is_created_on_demand() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("vault.db");
        let pool = setup_database(&path).await.unwrap();

        let _: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM replays")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn schema_rejects_unknown_status() {
        let pool = setup_test_database().await.unwrap();
        let result = sqlx::query(
            "INSERT INTO replays (replay_id, group_id, status, first_seen_at)
             VALUES ('r1', 'g1', 'exploded', '2026-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await;
        assert!(result.is_err());
    }
}
