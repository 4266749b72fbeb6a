//! Point-in-time snapshots of watched fields and the comparison algorithm.
//!
//! A [`Snapshot`] maps entity type -> entity id -> field name -> normalized
//! value. Normalization turns every stored value into either its string
//! form or `None`, so two nulls compare equal and a number compares with
//! the same rule as its textual form.
//!
//! [`compare_snapshots`] only reports entities present on both sides. Rows
//! inserted or deleted between the two snapshots never produce a change.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::DbId;
use crate::watch::WatchedFieldRegistry;

/// A normalized watched-field value. `None` is the null sentinel.
pub type FieldValue = Option<String>;

/// Watched fields of a single entity.
pub type EntityFields = BTreeMap<String, FieldValue>;

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Captured state of every watched entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    entities: BTreeMap<String, BTreeMap<DbId, EntityFields>>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity type with no rows, so an empty table is still
    /// represented in the snapshot.
    pub fn ensure_entity_type(&mut self, entity_type: &str) {
        self.entities.entry(entity_type.to_string()).or_default();
    }

    /// Insert (or replace) the watched fields of one entity.
    pub fn insert(&mut self, entity_type: &str, entity_id: DbId, fields: EntityFields) {
        self.entities
            .entry(entity_type.to_string())
            .or_default()
            .insert(entity_id, fields);
    }

    /// Builder-style variant of [`insert`](Self::insert) for tests and fixtures.
    pub fn with_entity<I, K>(mut self, entity_type: &str, entity_id: DbId, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, FieldValue)>,
        K: Into<String>,
    {
        let fields = fields.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.insert(entity_type, entity_id, fields);
        self
    }

    /// Watched fields of one entity, if it was captured.
    pub fn get(&self, entity_type: &str, entity_id: DbId) -> Option<&EntityFields> {
        self.entities.get(entity_type)?.get(&entity_id)
    }

    /// All captured entities of one type, ordered by id.
    pub fn entities_of(&self, entity_type: &str) -> Option<&BTreeMap<DbId, EntityFields>> {
        self.entities.get(entity_type)
    }

    /// Number of entities captured across all types.
    pub fn entity_count(&self) -> usize {
        self.entities.values().map(BTreeMap::len).sum()
    }
}

// ---------------------------------------------------------------------------
// FieldChange
// ---------------------------------------------------------------------------

/// A watched field whose normalized value differs between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub entity_type: String,
    pub entity_id: DbId,
    pub field: String,
    pub old_value: FieldValue,
    pub new_value: FieldValue,
}

/// Render a value the way operator messages show it; null prints as `None`.
pub fn display_value(value: &FieldValue) -> &str {
    value.as_deref().unwrap_or("None")
}

impl std::fmt::Display for FieldChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} #{}: {} changed from '{}' to '{}'",
            self.entity_type,
            self.entity_id,
            self.field,
            display_value(&self.old_value),
            display_value(&self.new_value),
        )
    }
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

/// Compare two snapshots field by field.
///
/// Output order: entity types in registry order, ids ascending, fields in
/// watched order. A field missing from an entity's map counts as null.
pub fn compare_snapshots(
    registry: &WatchedFieldRegistry,
    before: &Snapshot,
    after: &Snapshot,
) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    for spec in registry.iter() {
        let (Some(old_rows), Some(new_rows)) = (
            before.entities_of(&spec.entity_type),
            after.entities_of(&spec.entity_type),
        ) else {
            continue;
        };

        for (entity_id, new_fields) in new_rows {
            // New rows are not changes.
            let Some(old_fields) = old_rows.get(entity_id) else {
                continue;
            };

            for field in &spec.fields {
                let old_value = old_fields.get(field).cloned().flatten();
                let new_value = new_fields.get(field).cloned().flatten();
                if old_value != new_value {
                    changes.push(FieldChange {
                        entity_type: spec.entity_type.clone(),
                        entity_id: *entity_id,
                        field: field.clone(),
                        old_value,
                        new_value,
                    });
                }
            }
        }
    }

    changes
}
