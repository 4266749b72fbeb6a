//! Full-table scans of watched columns.
//!
//! Values are normalized in SQL with `CAST(col AS TEXT)`, so INTEGER, REAL
//! and TEXT storage classes all come back as strings and NULL stays `None`.

use std::collections::BTreeMap;

use nucdb_core::snapshot::EntityFields;
use nucdb_core::types::DbId;
use nucdb_core::watch::WatchedEntitySpec;
use sqlx::{Row, SqlitePool};

/// Reads watched entity tables.
pub struct WatchedEntityRepo;

impl WatchedEntityRepo {
    /// Build the scan query for one spec.
    ///
    /// Identifiers are validated by the registry and quoted here.
    pub fn scan_query(spec: &WatchedEntitySpec) -> String {
        let casts: Vec<String> = spec
            .fields
            .iter()
            .map(|f| format!("CAST(\"{f}\" AS TEXT) AS \"{f}\""))
            .collect();
        format!(
            "SELECT \"{key}\", {casts} FROM \"{table}\" ORDER BY \"{key}\"",
            key = spec.key,
            casts = casts.join(", "),
            table = spec.table,
        )
    }

    /// Read the key and normalized watched fields of every row.
    pub async fn scan(
        pool: &SqlitePool,
        spec: &WatchedEntitySpec,
    ) -> Result<BTreeMap<DbId, EntityFields>, sqlx::Error> {
        let query = Self::scan_query(spec);
        let rows = sqlx::query(&query).fetch_all(pool).await?;

        let mut entities = BTreeMap::new();
        for row in rows {
            let entity_id: DbId = row.try_get(0)?;
            let mut fields = EntityFields::new();
            for (i, field) in spec.fields.iter().enumerate() {
                let value: Option<String> = row.try_get(i + 1)?;
                fields.insert(field.clone(), value);
            }
            entities.insert(entity_id, fields);
        }

        tracing::debug!(
            entity_type = %spec.entity_type,
            table = %spec.table,
            rows = entities.len(),
            "Scanned watched table"
        );

        Ok(entities)
    }
}
