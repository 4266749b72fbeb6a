//! Run log entity model (`run_logs` table).

use nucdb_core::error::CoreError;
use nucdb_core::run_status::RunStatus;
use nucdb_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// One execution of one ingestion task.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RunLog {
    pub id: DbId,
    pub script_name: String,
    pub status: String,
    pub started_at: Timestamp,
    pub finished_at: Option<Timestamp>,
    pub records_processed: i64,
    pub records_inserted: i64,
    pub records_updated: i64,
    pub error_message: Option<String>,
}

impl RunLog {
    /// Parsed status column.
    pub fn run_status(&self) -> Result<RunStatus, CoreError> {
        RunStatus::from_name(&self.status)
    }
}
