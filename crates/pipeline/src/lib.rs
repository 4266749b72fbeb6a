//! Scheduled ingestion pipeline.
//!
//! - [`RunLedger`] -- append-only history of task runs and detected changes.
//! - [`DiffEngine`] -- snapshots watched fields and diffs them after a task.
//! - [`TaskRegistry`] / [`IngestTask`] -- the fixed, ordered task sequence.
//! - [`TaskOrchestrator`] -- runs the sequence once or on an interval.

pub mod command;
pub mod diff_engine;
pub mod error;
pub mod ledger;
pub mod orchestrator;
pub mod task;

pub use command::{CommandTask, CommandTemplate};
pub use diff_engine::DiffEngine;
pub use error::{DiffError, LedgerError, PipelineError};
pub use ledger::RunLedger;
pub use orchestrator::{OrchestratorOptions, PassSummary, TaskOrchestrator};
pub use task::{IngestTask, TaskRegistry};
