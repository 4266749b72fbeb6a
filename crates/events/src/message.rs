//! Operator message type and the three report builders.
//!
//! Builders return `None` when there is nothing worth sending, so callers
//! never dispatch empty reports.

use nucdb_core::snapshot::FieldChange;
use nucdb_core::task::TaskStats;
use serde::Serialize;

/// Prefix shared by every subject line.
const SUBJECT_PREFIX: &str = "Nuclear DB";

/// A (subject, body) pair. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationMessage {
    pub subject: String,
    pub body: String,
}

impl NotificationMessage {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// Consolidated report of detected changes; `None` for an empty list.
pub fn changes_message(changes: &[FieldChange]) -> Option<NotificationMessage> {
    if changes.is_empty() {
        return None;
    }

    let lines: Vec<String> = changes.iter().map(|c| format!("- {c}")).collect();
    let body = format!(
        "{} data change(s) detected:\n\n{}",
        changes.len(),
        lines.join("\n")
    );
    Some(NotificationMessage::new(
        format!("{SUBJECT_PREFIX}: Data Changes Detected"),
        body,
    ))
}

/// Failure report carrying the full error text.
pub fn failure_message(script_name: &str, error: &str) -> NotificationMessage {
    NotificationMessage::new(
        format!("{SUBJECT_PREFIX}: Script Failure - {script_name}"),
        format!("Script '{script_name}' failed with error:\n\n{error}"),
    )
}

/// Completion report; `None` when the run neither inserted nor updated rows.
pub fn success_message(script_name: &str, stats: &TaskStats) -> Option<NotificationMessage> {
    if !stats.has_writes() {
        return None;
    }

    Some(NotificationMessage::new(
        format!("{SUBJECT_PREFIX}: {script_name} completed"),
        format!(
            "Script '{script_name}' completed: {} processed, {} inserted, {} updated.",
            stats.processed, stats.inserted, stats.updated
        ),
    ))
}
