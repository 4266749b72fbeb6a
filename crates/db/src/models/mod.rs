//! Ledger row structs and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row and, where rows are inserted from outside the
//! repository, a create DTO.

pub mod data_change;
pub mod run_log;
