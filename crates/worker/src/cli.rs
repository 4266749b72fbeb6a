use clap::{Parser, Subcommand};

use crate::config::MAX_INTERVAL_HOURS;

#[derive(Debug, Parser)]
#[command(name = "nucdb-worker")]
#[command(about = "Nuclear database ingestion scheduler", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Subcommand to execute; a bare invocation runs one pass.
    pub fn action(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run every ingestion task once and exit
    Run,

    /// Run immediately, then repeat on an interval until stopped
    Daemon {
        /// Hours between passes (overrides SCHEDULER_INTERVAL_HOURS)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..=MAX_INTERVAL_HOURS))]
        interval_hours: Option<u64>,
    },

    /// Apply pending database migrations and exit
    Migrate,

    /// Show recent task runs
    History {
        /// Number of runs to show
        #[arg(short, long, default_value_t = 20)]
        limit: i64,

        /// Include the changes detected by each run
        #[arg(long)]
        changes: bool,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}
