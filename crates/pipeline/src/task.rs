//! Ingestion task seam and the ordered task registry.
//!
//! Tasks are resolved once at startup into a [`TaskRegistry`]; the
//! orchestrator runs them in registration order on every pass.

use std::sync::Arc;

use async_trait::async_trait;
use nucdb_core::error::CoreError;
use nucdb_core::task::TaskOutcome;

/// Task names run by the scheduler, in order.
pub const DEFAULT_TASK_SEQUENCE: [&str; 5] = [
    "ingest_nrc_reactors",
    "ingest_decommissioning",
    "ingest_usaspending",
    "ingest_trust_funds",
    "ingest_nrc_events",
];

/// One named unit of ingestion work.
///
/// A task writes its own business data to the store. The orchestrator only
/// looks at the outcome and at watched fields before and after the run.
#[async_trait]
pub trait IngestTask: Send + Sync {
    /// Name recorded in the run ledger and used in notifications.
    fn name(&self) -> &str;

    /// Entry point. Report failure through [`TaskOutcome::Failed`].
    async fn run(&self) -> TaskOutcome;
}

/// Ordered set of tasks with unique names.
#[derive(Clone, Default)]
pub struct TaskRegistry {
    tasks: Vec<Arc<dyn IngestTask>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a task to the sequence. Names must be unique.
    pub fn register(&mut self, task: Arc<dyn IngestTask>) -> Result<(), CoreError> {
        if task.name().trim().is_empty() {
            return Err(CoreError::Validation("Task name must not be empty".into()));
        }
        if self.tasks.iter().any(|t| t.name() == task.name()) {
            return Err(CoreError::Conflict(format!(
                "Task '{}' is registered more than once",
                task.name()
            )));
        }
        self.tasks.push(task);
        Ok(())
    }

    /// Builder-style variant of [`register`](Self::register).
    pub fn with(mut self, task: Arc<dyn IngestTask>) -> Result<Self, CoreError> {
        self.register(task)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn IngestTask>> {
        self.tasks.iter().find(|t| t.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn IngestTask>> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
