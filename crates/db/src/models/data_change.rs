//! Detected watched-field change model (`data_changes` table, append-only).

use nucdb_core::snapshot::FieldChange;
use nucdb_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A persisted change observation tied to the run that detected it.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DataChange {
    pub id: DbId,
    pub run_log_id: DbId,
    pub entity_type: String,
    pub entity_id: DbId,
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub detected_at: Timestamp,
}

/// DTO for appending a change record.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDataChange {
    pub run_log_id: DbId,
    pub entity_type: String,
    pub entity_id: DbId,
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

impl CreateDataChange {
    pub fn from_field_change(run_log_id: DbId, change: &FieldChange) -> Self {
        Self {
            run_log_id,
            entity_type: change.entity_type.clone(),
            entity_id: change.entity_id,
            field_name: change.field.clone(),
            old_value: change.old_value.clone(),
            new_value: change.new_value.clone(),
        }
    }
}
