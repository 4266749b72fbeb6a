//! Repository for the `run_logs` table.

use chrono::Utc;
use nucdb_core::run_status::{STATUS_FAILURE, STATUS_STARTED, STATUS_SUCCESS};
use nucdb_core::task::TaskStats;
use nucdb_core::types::DbId;
use sqlx::SqlitePool;

use crate::models::run_log::RunLog;

/// Column list for `run_logs` queries.
const COLUMNS: &str = "\
    id, script_name, status, started_at, finished_at, \
    records_processed, records_inserted, records_updated, error_message";

/// Provides query operations for task run records.
pub struct RunLogRepo;

impl RunLogRepo {
    /// Insert a new run with status "started".
    pub async fn create(pool: &SqlitePool, script_name: &str) -> Result<RunLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO run_logs (script_name, status, started_at) \
             VALUES (?, '{STATUS_STARTED}', ?) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RunLog>(&query)
            .bind(script_name)
            .bind(Utc::now())
            .fetch_one(pool)
            .await
    }

    /// Move a started run to "success" and record its counters.
    ///
    /// Returns `None` when no started run with this id exists; a finalized
    /// run is never overwritten.
    pub async fn mark_success(
        pool: &SqlitePool,
        id: DbId,
        stats: &TaskStats,
    ) -> Result<Option<RunLog>, sqlx::Error> {
        let query = format!(
            "UPDATE run_logs \
             SET status = '{STATUS_SUCCESS}', finished_at = ?, \
                 records_processed = ?, records_inserted = ?, records_updated = ? \
             WHERE id = ? AND status = '{STATUS_STARTED}' \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RunLog>(&query)
            .bind(Utc::now())
            .bind(stats.processed)
            .bind(stats.inserted)
            .bind(stats.updated)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Move a started run to "failure" and store the error text.
    ///
    /// Returns `None` when no started run with this id exists.
    pub async fn mark_failure(
        pool: &SqlitePool,
        id: DbId,
        error_message: &str,
    ) -> Result<Option<RunLog>, sqlx::Error> {
        let query = format!(
            "UPDATE run_logs \
             SET status = '{STATUS_FAILURE}', finished_at = ?, error_message = ? \
             WHERE id = ? AND status = '{STATUS_STARTED}' \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RunLog>(&query)
            .bind(Utc::now())
            .bind(error_message)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a run by id.
    pub async fn find_by_id(pool: &SqlitePool, id: DbId) -> Result<Option<RunLog>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM run_logs WHERE id = ?");
        sqlx::query_as::<_, RunLog>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List the most recent runs, newest first.
    pub async fn list_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<RunLog>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM run_logs ORDER BY id DESC LIMIT ?");
        sqlx::query_as::<_, RunLog>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
