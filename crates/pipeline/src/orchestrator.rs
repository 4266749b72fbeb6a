//! Task orchestrator.
//!
//! Runs the registered tasks strictly in order. For each task:
//!
//! 1. start a run in the ledger,
//! 2. snapshot watched fields,
//! 3. run the task,
//! 4. on success, diff against the snapshot and finish the run,
//! 5. on failure, fail the run and send a failure notification.
//!
//! A failing task never stops the sequence. Once every task has run, all
//! detected changes go out in one consolidated notification.
//!
//! Ledger errors are the only thing that aborts a pass.

use std::sync::Arc;
use std::time::Duration;

use nucdb_core::snapshot::FieldChange;
use nucdb_core::task::TaskOutcome;
use nucdb_events::{notify_changes, notify_failure, notify_success, Notifier};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::diff_engine::DiffEngine;
use crate::error::PipelineError;
use crate::ledger::RunLedger;
use crate::task::{IngestTask, TaskRegistry};

/// Behaviour switches for the orchestrator.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrchestratorOptions {
    /// Send a completion report after each task that inserted or updated rows.
    pub notify_on_success: bool,
}

/// Result of one pass over the task sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub succeeded: usize,
    pub failed: usize,
    /// Every change detected during the pass, in task order.
    pub changes: Vec<FieldChange>,
}

/// Runs the fixed task sequence.
pub struct TaskOrchestrator {
    ledger: RunLedger,
    diff: DiffEngine,
    tasks: TaskRegistry,
    notifier: Arc<dyn Notifier>,
    options: OrchestratorOptions,
}

impl TaskOrchestrator {
    pub fn new(
        ledger: RunLedger,
        diff: DiffEngine,
        tasks: TaskRegistry,
        notifier: Arc<dyn Notifier>,
        options: OrchestratorOptions,
    ) -> Self {
        Self {
            ledger,
            diff,
            tasks,
            notifier,
            options,
        }
    }

    /// Execute the whole sequence once.
    pub async fn run_once(&self) -> Result<PassSummary, PipelineError> {
        tracing::info!(tasks = self.tasks.len(), "Starting scheduled ingestion run");

        let mut summary = PassSummary::default();

        for task in self.tasks.iter() {
            match self.run_task(task.as_ref()).await? {
                Some(changes) => {
                    summary.succeeded += 1;
                    summary.changes.extend(changes);
                }
                None => summary.failed += 1,
            }
        }

        if notify_changes(self.notifier.as_ref(), &summary.changes).await {
            tracing::info!(total = summary.changes.len(), "Total changes detected");
        }

        tracing::info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Scheduled run complete"
        );

        Ok(summary)
    }

    /// Execute the sequence now, then every `interval`, until `cancel` fires.
    ///
    /// Cancellation is only observed between passes; a pass that has started
    /// always runs to completion. A pass aborted by a ledger error is logged
    /// and the schedule continues.
    pub async fn run_continuous(&self, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval_secs = interval.as_secs(), "Scheduler started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Scheduler stopped");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        tracing::error!(error = %e, "Scheduled run aborted");
                    }
                }
            }
        }
    }

    /// Run one task through its full lifecycle.
    ///
    /// Returns the detected changes on success, `None` on a task failure.
    async fn run_task(
        &self,
        task: &dyn IngestTask,
    ) -> Result<Option<Vec<FieldChange>>, PipelineError> {
        let name = task.name();
        let run_id = self.ledger.start_run(name).await?;
        tracing::info!(run_id, task = name, "Running task");

        let outcome = match self.diff.take_snapshot().await {
            Err(e) => Err(e.to_string()),
            Ok(snapshot) => match task.run().await {
                TaskOutcome::Failed(error) => Err(error),
                TaskOutcome::Succeeded(stats) => {
                    match self.diff.detect_changes(&snapshot, run_id).await {
                        Ok(changes) => Ok((stats, changes)),
                        Err(e) => Err(e.to_string()),
                    }
                }
            },
        };

        match outcome {
            Ok((stats, changes)) => {
                self.ledger.finish_run(run_id, &stats).await?;
                tracing::info!(
                    run_id,
                    task = name,
                    changes = changes.len(),
                    "Task completed successfully"
                );

                if self.options.notify_on_success {
                    notify_success(self.notifier.as_ref(), name, &stats).await;
                }
                Ok(Some(changes))
            }
            Err(error) => {
                self.ledger.fail_run(run_id, &error).await?;
                tracing::error!(run_id, task = name, error = %error, "Task FAILED");
                notify_failure(self.notifier.as_ref(), name, &error).await;
                Ok(None)
            }
        }
    }
}
