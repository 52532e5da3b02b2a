//! Database operations for `sync_runs`.
//!
//! Lifecycle: `queued` → `running` → `completed` | `failed`. Transitions
//! that skip a state are rejected with [`DbError::InvalidSyncRunTransition`].

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const SYNC_RUN_COLUMNS: &str = "id, public_id, mode, trigger_source, category, status, \
     started_at, completed_at, items_processed, tokens_used, error_count, error_message, created_at";

/// A row from the `sync_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SyncRunRow {
    pub id: i64,
    pub public_id: Uuid,
    /// `"discovery"` or `"refresh"`.
    pub mode: String,
    /// `"api"`, `"cli"`, or `"scheduler"`.
    pub trigger_source: String,
    pub category: Option<String>,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub items_processed: i32,
    pub tokens_used: i64,
    pub error_count: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Creates a run in `queued` status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_sync_run(
    pool: &PgPool,
    mode: &str,
    trigger_source: &str,
    category: Option<&str>,
) -> Result<SyncRunRow, DbError> {
    let sql = format!(
        "INSERT INTO sync_runs (public_id, mode, trigger_source, category, status) \
         VALUES ($1, $2, $3, $4, 'queued') \
         RETURNING {SYNC_RUN_COLUMNS}"
    );
    let row = sqlx::query_as::<_, SyncRunRow>(&sql)
        .bind(Uuid::new_v4())
        .bind(mode)
        .bind(trigger_source)
        .bind(category)
        .fetch_one(pool)
        .await?;
    Ok(row)
}

/// Marks a queued run as `running`.
///
/// # Errors
///
/// Returns [`DbError::InvalidSyncRunTransition`] if the run is not queued.
pub async fn start_sync_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE sync_runs SET status = 'running', started_at = NOW() \
         WHERE id = $1 AND status = 'queued'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidSyncRunTransition {
            id,
            expected_status: "queued",
        });
    }
    Ok(())
}

/// Marks a running run as `completed`. A run with per-item errors still
/// completes; `error_count` records how many there were.
///
/// # Errors
///
/// Returns [`DbError::InvalidSyncRunTransition`] if the run is not running.
pub async fn complete_sync_run(
    pool: &PgPool,
    id: i64,
    items_processed: i32,
    tokens_used: i64,
    error_count: i32,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE sync_runs \
         SET status = 'completed', completed_at = NOW(), \
             items_processed = $1, tokens_used = $2, error_count = $3 \
         WHERE id = $4 AND status = 'running'",
    )
    .bind(items_processed)
    .bind(tokens_used)
    .bind(error_count)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidSyncRunTransition {
            id,
            expected_status: "running",
        });
    }
    Ok(())
}

/// Marks a queued or running run as `failed`.
///
/// # Errors
///
/// Returns [`DbError::InvalidSyncRunTransition`] if the run already finished.
pub async fn fail_sync_run(pool: &PgPool, id: i64, error_message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE sync_runs \
         SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE id = $2 AND status IN ('queued', 'running')",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidSyncRunTransition {
            id,
            expected_status: "running",
        });
    }
    Ok(())
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no run has this id.
pub async fn get_sync_run(pool: &PgPool, id: i64) -> Result<SyncRunRow, DbError> {
    let sql = format!("SELECT {SYNC_RUN_COLUMNS} FROM sync_runs WHERE id = $1");
    sqlx::query_as::<_, SyncRunRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// Most recent `limit` runs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_sync_runs(pool: &PgPool, limit: i64) -> Result<Vec<SyncRunRow>, DbError> {
    let sql = format!(
        "SELECT {SYNC_RUN_COLUMNS} FROM sync_runs ORDER BY created_at DESC, id DESC LIMIT $1"
    );
    let rows = sqlx::query_as::<_, SyncRunRow>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Total tokens recorded by runs that completed at or after `since`.
///
/// Used to seed an in-process budget after a restart.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn tokens_used_since(pool: &PgPool, since: DateTime<Utc>) -> Result<i64, DbError> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(tokens_used), 0)::BIGINT FROM sync_runs \
         WHERE status = 'completed' AND completed_at >= $1",
    )
    .bind(since)
    .fetch_one(pool)
    .await?;
    Ok(total)
}
