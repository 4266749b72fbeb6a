//! Run-record status and its state machine.
//!
//! A run is created `started` and moves exactly once to `success` or
//! `failure`. Both are terminal; there is no retry edge. A failed task is
//! only attempted again on the next scheduled pass, under a new run id.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const STATUS_STARTED: &str = "started";
pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_FAILURE: &str = "failure";

/// Status of one run record, stored as text in `run_logs.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Started,
    Success,
    Failure,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Started => STATUS_STARTED,
            Self::Success => STATUS_SUCCESS,
            Self::Failure => STATUS_FAILURE,
        }
    }

    /// Parse from the database `status` column.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            STATUS_STARTED => Ok(Self::Started),
            STATUS_SUCCESS => Ok(Self::Success),
            STATUS_FAILURE => Ok(Self::Failure),
            other => Err(CoreError::Validation(format!(
                "Unknown run status '{other}'"
            ))),
        }
    }

    /// Whether `self -> to` is a legal transition.
    pub fn can_transition(self, to: RunStatus) -> bool {
        matches!(
            (self, to),
            (Self::Started, Self::Success) | (Self::Started, Self::Failure)
        )
    }

    /// Validate a transition, returning an error message for illegal ones.
    pub fn validate_transition(self, to: RunStatus) -> Result<(), CoreError> {
        if self.can_transition(to) {
            Ok(())
        } else {
            Err(CoreError::Conflict(format!(
                "Invalid run transition: {self} -> {to}"
            )))
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
