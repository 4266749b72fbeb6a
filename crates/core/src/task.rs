//! Outcome of one ingestion task invocation.
//!
//! Tasks report failure as a value rather than by panicking, so the
//! orchestrator can record it and move on to the next task.

use serde::{Deserialize, Serialize};

/// Row counters reported by a task that completed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStats {
    pub processed: i64,
    pub inserted: i64,
    pub updated: i64,
}

impl TaskStats {
    pub fn new(processed: i64, inserted: i64, updated: i64) -> Self {
        Self {
            processed,
            inserted,
            updated,
        }
    }

    /// Whether the task wrote anything.
    pub fn has_writes(&self) -> bool {
        self.inserted > 0 || self.updated > 0
    }
}

/// Result of running a task's entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Succeeded(TaskStats),
    /// Full error description, stored verbatim in the run record.
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_writes_only_when_inserted_or_updated() {
        assert!(!TaskStats::new(5, 0, 0).has_writes());
        assert!(TaskStats::new(5, 1, 0).has_writes());
        assert!(TaskStats::new(5, 0, 2).has_writes());
    }
}
