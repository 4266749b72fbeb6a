//! `nucdb-worker` library half: configuration, command line and history
//! rendering used by the binary.

pub mod cli;
pub mod config;
pub mod history;
