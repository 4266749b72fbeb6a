//! Domain types and pure algorithms for the nucdb ingestion scheduler.
//!
//! This crate performs no I/O. It holds the watched-field registry, the
//! snapshot comparison algorithm, the run-status state machine, and the
//! task outcome types shared by the `db`, `events` and `pipeline` crates.

pub mod channels;
pub mod error;
pub mod run_status;
pub mod snapshot;
pub mod task;
pub mod types;
pub mod watch;
