//! Run ledger.
//!
//! Every task execution gets one `run_logs` row, created `started` and
//! finalized exactly once. A second terminal call for the same run is
//! rejected with [`LedgerError::AlreadyFinalized`] and the stored row is
//! left untouched.
//!
//! The schema is created by [`nucdb_db::run_migrations`] at startup; the
//! ledger never creates tables on demand.

use nucdb_core::error::CoreError;
use nucdb_core::run_status::RunStatus;
use nucdb_core::snapshot::FieldChange;
use nucdb_core::task::TaskStats;
use nucdb_core::types::DbId;
use nucdb_db::models::data_change::{CreateDataChange, DataChange};
use nucdb_db::models::run_log::RunLog;
use nucdb_db::repositories::{DataChangeRepo, RunLogRepo};
use nucdb_db::DbPool;

use crate::error::LedgerError;

/// Append-only run history backed by the ledger tables.
#[derive(Clone)]
pub struct RunLedger {
    pool: DbPool,
}

impl RunLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Record the start of a task run and return its id.
    pub async fn start_run(&self, script_name: &str) -> Result<DbId, LedgerError> {
        let run = RunLogRepo::create(&self.pool, script_name).await?;
        tracing::debug!(run_id = run.id, script = script_name, "Run started");
        Ok(run.id)
    }

    /// Mark a run successful with its counters.
    pub async fn finish_run(&self, run_id: DbId, stats: &TaskStats) -> Result<RunLog, LedgerError> {
        match RunLogRepo::mark_success(&self.pool, run_id, stats).await? {
            Some(run) => Ok(run),
            None => Err(self.rejection(run_id, RunStatus::Success).await),
        }
    }

    /// Mark a run failed and keep the full error text.
    pub async fn fail_run(&self, run_id: DbId, error_text: &str) -> Result<RunLog, LedgerError> {
        match RunLogRepo::mark_failure(&self.pool, run_id, error_text).await? {
            Some(run) => Ok(run),
            None => Err(self.rejection(run_id, RunStatus::Failure).await),
        }
    }

    /// Append one detected change to a run.
    pub async fn record_change(
        &self,
        run_id: DbId,
        change: &FieldChange,
    ) -> Result<DataChange, LedgerError> {
        let row = CreateDataChange::from_field_change(run_id, change);
        Ok(DataChangeRepo::create(&self.pool, &row).await?)
    }

    /// Append every change detected by a run in one transaction.
    ///
    /// Either all rows are stored or none are.
    pub async fn record_changes(
        &self,
        run_id: DbId,
        changes: &[FieldChange],
    ) -> Result<u64, LedgerError> {
        let rows: Vec<CreateDataChange> = changes
            .iter()
            .map(|change| CreateDataChange::from_field_change(run_id, change))
            .collect();
        Ok(DataChangeRepo::create_batch(&self.pool, &rows).await?)
    }

    pub async fn get_run(&self, run_id: DbId) -> Result<Option<RunLog>, LedgerError> {
        Ok(RunLogRepo::find_by_id(&self.pool, run_id).await?)
    }

    pub async fn list_recent_runs(&self, limit: i64) -> Result<Vec<RunLog>, LedgerError> {
        Ok(RunLogRepo::list_recent(&self.pool, limit).await?)
    }

    pub async fn list_changes_for_run(&self, run_id: DbId) -> Result<Vec<DataChange>, LedgerError> {
        Ok(DataChangeRepo::list_by_run(&self.pool, run_id).await?)
    }

    /// Explain why a conditional update to `target` matched no row.
    async fn rejection(&self, run_id: DbId, target: RunStatus) -> LedgerError {
        match RunLogRepo::find_by_id(&self.pool, run_id).await {
            Ok(Some(run)) => {
                let status = match run.run_status() {
                    Ok(status) => status,
                    Err(e) => return LedgerError::Core(e),
                };
                match status.validate_transition(target) {
                    Err(e) => {
                        tracing::warn!(run_id, error = %e, "Rejected second finalization of run");
                        LedgerError::AlreadyFinalized { run_id, status }
                    }
                    // Still `started`: the row changed between the update and this read.
                    Ok(()) => LedgerError::Core(CoreError::Conflict(format!(
                        "Run {run_id} could not be moved to '{target}'"
                    ))),
                }
            }
            Ok(None) => LedgerError::RunNotFound(run_id),
            Err(e) => LedgerError::Database(e),
        }
    }
}
