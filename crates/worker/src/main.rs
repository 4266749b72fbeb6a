//! `nucdb-worker` -- nuclear database ingestion scheduler.
//!
//! Runs the ingestion scripts in a fixed order, records each run in the
//! ledger, diffs watched fields around every script, and notifies
//! operators of failures and detected changes.
//!
//! # Subcommands
//!
//! | Command   | Description                                              |
//! |-----------|----------------------------------------------------------|
//! | `run`     | One pass over every task, then exit (default)           |
//! | `daemon`  | One pass now, then one per interval until SIGINT/SIGTERM |
//! | `migrate` | Apply pending migrations and exit                        |
//! | `history` | Print recent runs and, optionally, their changes         |
//!
//! Configuration is read from the environment; see [`WorkerConfig`].

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use nucdb_core::watch::WatchedFieldRegistry;
use nucdb_db::DbPool;
use nucdb_events::NotificationRouter;
use nucdb_pipeline::task::DEFAULT_TASK_SEQUENCE;
use nucdb_pipeline::{
    CommandTemplate, DiffEngine, OrchestratorOptions, RunLedger, TaskOrchestrator,
};
use nucdb_worker::cli::{Cli, Command};
use nucdb_worker::config::{hours, WorkerConfig, SCRIPT_DATABASE_VAR};
use nucdb_worker::history;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor `LOG_LEVEL` is set.
const DEFAULT_LOG_FILTER: &str =
    "nucdb_worker=info,nucdb_pipeline=info,nucdb_events=info,nucdb_db=info";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = WorkerConfig::from_env().context("Invalid configuration")?;

    // --- Database ---
    let pool = nucdb_db::create_pool(&config.database_url)
        .await
        .with_context(|| format!("Failed to open database {}", config.database_url))?;
    nucdb_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    nucdb_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!(database_url = %config.database_url, "Database ready");

    match cli.action() {
        Command::Migrate => {
            tracing::info!("Migrations applied");
            Ok(())
        }
        Command::History {
            limit,
            changes,
            json,
        } => print_history(&pool, limit, changes, json).await,
        Command::Run => {
            let summary = build_orchestrator(&config, pool)?.run_once().await?;
            if summary.failed > 0 {
                let total = summary.succeeded + summary.failed;
                anyhow::bail!("{} of {total} task(s) failed", summary.failed);
            }
            Ok(())
        }
        Command::Daemon { interval_hours } => {
            let interval = match interval_hours {
                Some(n) => hours(n).context("Invalid --interval-hours")?,
                None => config.interval,
            };
            let orchestrator = build_orchestrator(&config, pool)?;

            let cancel = CancellationToken::new();
            let signal_cancel = cancel.clone();
            tokio::spawn(async move {
                shutdown_signal().await;
                signal_cancel.cancel();
            });

            orchestrator.run_continuous(interval, cancel).await;
            tracing::info!("Shutdown complete");
            Ok(())
        }
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins; otherwise `LOG_LEVEL` applies to every `nucdb_*`
/// crate. `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match std::env::var("LOG_LEVEL") {
            Ok(level) if !level.trim().is_empty() => {
                let level = level.trim().to_ascii_lowercase();
                ["nucdb_worker", "nucdb_pipeline", "nucdb_events", "nucdb_db"]
                    .iter()
                    .map(|krate| format!("{krate}={level}"))
                    .collect::<Vec<_>>()
                    .join(",")
                    .into()
            }
            _ => DEFAULT_LOG_FILTER.into(),
        }
    });

    let json = std::env::var("LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn build_orchestrator(config: &WorkerConfig, pool: DbPool) -> Result<TaskOrchestrator> {
    let mut template = CommandTemplate::parse(&config.ingest_command)?;
    if let Some(path) = config.database_path() {
        template = template.with_env(SCRIPT_DATABASE_VAR, path);
    }
    let tasks = template.registry(&DEFAULT_TASK_SEQUENCE, config.task_timeout)?;

    let router = NotificationRouter::new(&config.notify);
    tracing::info!(
        channel = %router.channel(),
        tasks = ?tasks.names(),
        command = %config.ingest_command,
        database_path = config.database_path(),
        "Scheduler configured",
    );

    let ledger = RunLedger::new(pool.clone());
    let diff = DiffEngine::new(
        pool,
        Arc::new(WatchedFieldRegistry::default_registry()),
        ledger.clone(),
    );

    Ok(TaskOrchestrator::new(
        ledger,
        diff,
        tasks,
        Arc::new(router),
        OrchestratorOptions {
            notify_on_success: config.notify_on_success,
        },
    ))
}

async fn print_history(pool: &DbPool, limit: i64, with_changes: bool, json: bool) -> Result<()> {
    let ledger = RunLedger::new(pool.clone());
    let runs = ledger.list_recent_runs(limit).await?;

    if json {
        let mut entries = Vec::with_capacity(runs.len());
        for run in &runs {
            let mut entry = serde_json::to_value(run)?;
            if with_changes {
                let changes = ledger.list_changes_for_run(run.id).await?;
                entry["changes"] = serde_json::to_value(changes)?;
            }
            entries.push(entry);
        }
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if runs.is_empty() {
        println!("No runs recorded.");
        return Ok(());
    }

    for run in &runs {
        println!("{}", history::format_run(run));
        if with_changes {
            for change in ledger.list_changes_for_run(run.id).await? {
                println!("{}", history::format_change(&change));
            }
        }
    }
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), stopping after the current pass");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, stopping after the current pass");
        }
    }
}
