//! Change detection around a task run.
//!
//! [`DiffEngine::take_snapshot`] does a full scan of every watched table.
//! [`DiffEngine::detect_changes`] scans again, compares against the earlier
//! snapshot with [`compare_snapshots`], and appends the changes to the run
//! ledger in one transaction before returning them. If that write fails no
//! change is stored for the run.

use std::sync::Arc;

use nucdb_core::snapshot::{compare_snapshots, FieldChange, Snapshot};
use nucdb_core::types::DbId;
use nucdb_core::watch::WatchedFieldRegistry;
use nucdb_db::repositories::WatchedEntityRepo;
use nucdb_db::DbPool;

use crate::error::DiffError;
use crate::ledger::RunLedger;

/// Snapshots watched fields and records differences.
#[derive(Clone)]
pub struct DiffEngine {
    pool: DbPool,
    registry: Arc<WatchedFieldRegistry>,
    ledger: RunLedger,
}

impl DiffEngine {
    pub fn new(pool: DbPool, registry: Arc<WatchedFieldRegistry>, ledger: RunLedger) -> Self {
        Self {
            pool,
            registry,
            ledger,
        }
    }

    pub fn registry(&self) -> &WatchedFieldRegistry {
        &self.registry
    }

    /// Capture the current watched-field values of every registered type.
    pub async fn take_snapshot(&self) -> Result<Snapshot, DiffError> {
        let mut snapshot = Snapshot::new();

        for spec in self.registry.iter() {
            let rows = WatchedEntityRepo::scan(&self.pool, spec)
                .await
                .map_err(|source| DiffError::Scan {
                    table: spec.table.clone(),
                    source,
                })?;

            snapshot.ensure_entity_type(&spec.entity_type);
            for (entity_id, fields) in rows {
                snapshot.insert(&spec.entity_type, entity_id, fields);
            }
        }

        Ok(snapshot)
    }

    /// Compare the current state against `before` and persist every change
    /// under `run_id`.
    pub async fn detect_changes(
        &self,
        before: &Snapshot,
        run_id: DbId,
    ) -> Result<Vec<FieldChange>, DiffError> {
        let after = self.take_snapshot().await?;
        let changes = compare_snapshots(&self.registry, before, &after);

        self.ledger.record_changes(run_id, &changes).await?;

        if !changes.is_empty() {
            tracing::info!(run_id, count = changes.len(), "Change(s) detected");
        }

        Ok(changes)
    }
}
