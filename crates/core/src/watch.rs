//! Watched-field registry.
//!
//! Declares, for each monitored entity type, which table backs it, which
//! column is its key, and which columns are watched for externally-caused
//! changes. Changing what is monitored is an edit to
//! [`WatchedFieldRegistry::default_registry`] and nothing else.

use crate::error::CoreError;

/// Longest table or column name accepted by the registry.
const MAX_IDENTIFIER_LEN: usize = 64;

/// Entity type label for rows of the `reactors` table.
pub const ENTITY_REACTOR: &str = "reactor";

/// Entity type label for rows of the `sites` table.
pub const ENTITY_SITE: &str = "site";

// ---------------------------------------------------------------------------
// WatchedEntitySpec
// ---------------------------------------------------------------------------

/// One monitored entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedEntitySpec {
    /// Label used in change records and notifications, e.g. `"reactor"`.
    pub entity_type: String,
    /// Backing table.
    pub table: String,
    /// Integer primary-key column.
    pub key: String,
    /// Watched columns, in comparison order.
    pub fields: Vec<String>,
}

impl WatchedEntitySpec {
    pub fn new(entity_type: &str, table: &str, key: &str, fields: &[&str]) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            table: table.to_string(),
            key: key.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// Check that every name is a safe SQL identifier and the field list is
    /// non-empty and free of duplicates.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.entity_type.trim().is_empty() {
            return Err(CoreError::Validation(
                "Watched entity type label must not be empty".into(),
            ));
        }
        require_identifier(&self.table, "table")?;
        require_identifier(&self.key, "key")?;

        if self.fields.is_empty() {
            return Err(CoreError::Validation(format!(
                "Entity type '{}' must watch at least one field",
                self.entity_type
            )));
        }

        for (i, field) in self.fields.iter().enumerate() {
            require_identifier(field, "field")?;
            if field == &self.key {
                return Err(CoreError::Validation(format!(
                    "Entity type '{}' cannot watch its own key column '{field}'",
                    self.entity_type
                )));
            }
            if self.fields[..i].contains(field) {
                return Err(CoreError::Validation(format!(
                    "Entity type '{}' lists field '{field}' more than once",
                    self.entity_type
                )));
            }
        }

        Ok(())
    }
}

/// Allowed identifier characters: ASCII alphanumeric and underscore, not
/// starting with a digit. Names are interpolated into scan queries.
pub fn is_safe_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_IDENTIFIER_LEN
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn require_identifier(name: &str, what: &str) -> Result<(), CoreError> {
    if is_safe_identifier(name) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid {what} name '{name}': must be 1-{MAX_IDENTIFIER_LEN} ASCII letters, \
             digits or underscores"
        )))
    }
}

// ---------------------------------------------------------------------------
// WatchedFieldRegistry
// ---------------------------------------------------------------------------

/// Ordered, validated set of [`WatchedEntitySpec`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedFieldRegistry {
    specs: Vec<WatchedEntitySpec>,
}

impl WatchedFieldRegistry {
    /// Build a registry, validating every spec and rejecting duplicate
    /// entity types.
    pub fn new(specs: Vec<WatchedEntitySpec>) -> Result<Self, CoreError> {
        for (i, spec) in specs.iter().enumerate() {
            spec.validate()?;
            if specs[..i].iter().any(|s| s.entity_type == spec.entity_type) {
                return Err(CoreError::Conflict(format!(
                    "Entity type '{}' is registered more than once",
                    spec.entity_type
                )));
            }
        }
        Ok(Self { specs })
    }

    /// The production registry: reactors and sites.
    pub fn default_registry() -> Self {
        Self {
            specs: vec![
                WatchedEntitySpec::new(
                    ENTITY_REACTOR,
                    "reactors",
                    "id",
                    &[
                        "status",
                        "license_expiration_date",
                        "capacity_mw",
                        "permanent_shutdown_date",
                    ],
                ),
                WatchedEntitySpec::new(
                    ENTITY_SITE,
                    "sites",
                    "id",
                    &["site_type", "owner", "operator", "total_capacity_mw"],
                ),
            ],
        }
    }

    /// Look up the spec for an entity type.
    pub fn get(&self, entity_type: &str) -> Option<&WatchedEntitySpec> {
        self.specs.iter().find(|s| s.entity_type == entity_type)
    }

    /// Iterate specs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &WatchedEntitySpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl Default for WatchedFieldRegistry {
    fn default() -> Self {
        Self::default_registry()
    }
}
