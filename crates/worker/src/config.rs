use std::time::Duration;

use nucdb_core::error::CoreError;
use nucdb_events::NotifyConfig;
use nucdb_pipeline::command::{DEFAULT_COMMAND_TEMPLATE, DEFAULT_TASK_TIMEOUT};

/// Default database location.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://nuclear.db";

/// Default hours between passes in daemon mode (one week).
pub const DEFAULT_INTERVAL_HOURS: u64 = 168;

/// Longest accepted daemon interval (ten years).
pub const MAX_INTERVAL_HOURS: u64 = 24 * 365 * 10;

/// Longest accepted run time for one script (one week).
pub const MAX_TASK_TIMEOUT_SECS: u64 = 7 * 24 * 3600;

/// Variable the ingestion scripts read their database file from.
pub const SCRIPT_DATABASE_VAR: &str = "DATABASE_PATH";

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    /// Time between passes in daemon mode.
    pub interval: Duration,
    /// Command template with a `{task}` placeholder.
    pub ingest_command: String,
    /// Upper bound on a single task's run time.
    pub task_timeout: Duration,
    pub notify_on_success: bool,
    pub notify: NotifyConfig,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                     |
    /// |----------------------------|-----------------------------|
    /// | `DATABASE_URL`             | `sqlite://nuclear.db`       |
    /// | `SCHEDULER_INTERVAL_HOURS` | `168`                       |
    /// | `INGEST_COMMAND`           | `python3 scripts/{task}.py` |
    /// | `INGEST_TIMEOUT_SECS`      | `3600`                      |
    /// | `NOTIFY_ON_SUCCESS`        | `false`                     |
    ///
    /// Notification settings are read by [`NotifyConfig::from_lookup`].
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let interval_hours = match get("SCHEDULER_INTERVAL_HOURS") {
            None => DEFAULT_INTERVAL_HOURS,
            Some(raw) => parse_bounded("SCHEDULER_INTERVAL_HOURS", &raw, MAX_INTERVAL_HOURS)?,
        };
        let interval = hours(interval_hours)?;

        let task_timeout = match get("INGEST_TIMEOUT_SECS") {
            None => DEFAULT_TASK_TIMEOUT,
            Some(raw) => Duration::from_secs(parse_bounded(
                "INGEST_TIMEOUT_SECS",
                &raw,
                MAX_TASK_TIMEOUT_SECS,
            )?),
        };

        let notify_on_success = match get("NOTIFY_ON_SUCCESS") {
            None => false,
            Some(raw) => parse_flag("NOTIFY_ON_SUCCESS", &raw)?,
        };

        Ok(Self {
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into()),
            interval,
            ingest_command: get("INGEST_COMMAND")
                .unwrap_or_else(|| DEFAULT_COMMAND_TEMPLATE.into()),
            task_timeout,
            notify_on_success,
            notify: NotifyConfig::from_lookup(&lookup)?,
        })
    }

    /// Database file the ingestion scripts should write to, derived from
    /// `database_url`. `None` for in-memory databases.
    pub fn database_path(&self) -> Option<&str> {
        let rest = self
            .database_url
            .strip_prefix("sqlite://")
            .or_else(|| self.database_url.strip_prefix("sqlite:"))?;
        let path = rest.split('?').next().unwrap_or_default();

        if path.is_empty() || path == ":memory:" {
            None
        } else {
            Some(path)
        }
    }
}

/// Daemon interval for a number of hours, between 1 and
/// [`MAX_INTERVAL_HOURS`].
pub fn hours(n: u64) -> Result<Duration, CoreError> {
    if n == 0 || n > MAX_INTERVAL_HOURS {
        return Err(CoreError::Validation(format!(
            "Interval must be between 1 and {MAX_INTERVAL_HOURS} hours, got {n}"
        )));
    }
    n.checked_mul(3600)
        .map(Duration::from_secs)
        .ok_or_else(|| CoreError::Validation(format!("Interval of {n} hours is too large")))
}

fn parse_bounded(key: &str, raw: &str, max: u64) -> Result<u64, CoreError> {
    match raw.parse::<u64>() {
        Ok(n) if (1..=max).contains(&n) => Ok(n),
        _ => Err(CoreError::Validation(format!(
            "{key} must be an integer between 1 and {max}, got '{raw}'"
        ))),
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, CoreError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(CoreError::Validation(format!(
            "{key} must be a boolean, got '{raw}'"
        ))),
    }
}
