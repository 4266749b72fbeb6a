//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&SqlitePool` as the first argument.

pub mod data_change_repo;
pub mod run_log_repo;
pub mod watched_entity_repo;

pub use data_change_repo::DataChangeRepo;
pub use run_log_repo::RunLogRepo;
pub use watched_entity_repo::WatchedEntityRepo;
