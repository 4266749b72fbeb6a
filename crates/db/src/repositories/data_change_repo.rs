//! Repository for the `data_changes` table (append-only).

use chrono::Utc;
use nucdb_core::types::DbId;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::models::data_change::{CreateDataChange, DataChange};

/// Column list for `data_changes` queries.
const COLUMNS: &str = "\
    id, run_log_id, entity_type, entity_id, field_name, \
    old_value, new_value, detected_at";

/// Rows per multi-row INSERT. Seven bound parameters each keeps a
/// statement well under SQLite's variable limit.
const BATCH_ROWS: usize = 500;

/// Provides insert and query operations for detected changes.
pub struct DataChangeRepo;

impl DataChangeRepo {
    /// Append one change record.
    pub async fn create(
        pool: &SqlitePool,
        change: &CreateDataChange,
    ) -> Result<DataChange, sqlx::Error> {
        let query = format!(
            "INSERT INTO data_changes \
             (run_log_id, entity_type, entity_id, field_name, old_value, new_value, detected_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DataChange>(&query)
            .bind(change.run_log_id)
            .bind(&change.entity_type)
            .bind(change.entity_id)
            .bind(&change.field_name)
            .bind(&change.old_value)
            .bind(&change.new_value)
            .bind(Utc::now())
            .fetch_one(pool)
            .await
    }

    /// Append many change records atomically. Returns the number stored.
    pub async fn create_batch(
        pool: &SqlitePool,
        changes: &[CreateDataChange],
    ) -> Result<u64, sqlx::Error> {
        if changes.is_empty() {
            return Ok(0);
        }

        let detected_at = Utc::now();
        let mut tx = pool.begin().await?;
        let mut stored = 0;

        for chunk in changes.chunks(BATCH_ROWS) {
            let mut query = QueryBuilder::<Sqlite>::new(
                "INSERT INTO data_changes (run_log_id, entity_type, entity_id, \
                 field_name, old_value, new_value, detected_at) ",
            );
            query.push_values(chunk, |mut row, change| {
                row.push_bind(change.run_log_id)
                    .push_bind(change.entity_type.clone())
                    .push_bind(change.entity_id)
                    .push_bind(change.field_name.clone())
                    .push_bind(change.old_value.clone())
                    .push_bind(change.new_value.clone())
                    .push_bind(detected_at);
            });
            stored += query.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        Ok(stored)
    }

    /// List all changes recorded by one run, in insertion order.
    pub async fn list_by_run(
        pool: &SqlitePool,
        run_log_id: DbId,
    ) -> Result<Vec<DataChange>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM data_changes \
             WHERE run_log_id = ? \
             ORDER BY id"
        );
        sqlx::query_as::<_, DataChange>(&query)
            .bind(run_log_id)
            .fetch_all(pool)
            .await
    }
}
