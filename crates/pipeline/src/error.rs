//! Error types for the pipeline crate.

use nucdb_core::error::CoreError;
use nucdb_core::run_status::RunStatus;
use nucdb_core::types::DbId;

/// Run ledger failures. Fatal to the call that triggered them.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Ledger database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Run {0} not found")]
    RunNotFound(DbId),

    /// A terminal call was made for a run that already left `started`.
    #[error("Run {run_id} is already finalized with status '{status}'")]
    AlreadyFinalized { run_id: DbId, status: RunStatus },

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Snapshot or diff failure. Recorded as a failure of the task's run.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    #[error("Failed to scan watched table '{table}': {source}")]
    Scan {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Failed to record detected change: {0}")]
    Record(#[from] LedgerError),
}

/// Errors that abort an orchestrator pass.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
