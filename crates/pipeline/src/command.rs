//! Ingestion tasks backed by external programs.
//!
//! Each [`CommandTask`] runs one ingestion script as a child process. Exit
//! status 0 is success; anything else (non-zero exit, spawn error,
//! timeout) is a failure whose description includes the exit code and the
//! script's stderr.
//!
//! The script's stdout goes straight to the worker's stdout. Its stderr,
//! where the scripts write their log, is captured and re-emitted line by
//! line through `tracing` under the task's name.

use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use nucdb_core::error::CoreError;
use nucdb_core::task::{TaskOutcome, TaskStats};
use tokio::process::Command;

use crate::task::{IngestTask, TaskRegistry};

/// Placeholder replaced by the task name in a [`CommandTemplate`].
pub const TASK_PLACEHOLDER: &str = "{task}";

/// Default command template.
pub const DEFAULT_COMMAND_TEMPLATE: &str = "python3 scripts/{task}.py";

/// Default limit on one script's run time.
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(3600);

// ---------------------------------------------------------------------------
// CommandTemplate
// ---------------------------------------------------------------------------

/// Whitespace-separated program and arguments containing `{task}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    program: String,
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl CommandTemplate {
    pub fn parse(template: &str) -> Result<Self, CoreError> {
        let mut parts = template.split_whitespace().map(String::from);
        let program = parts
            .next()
            .ok_or_else(|| CoreError::Validation("Ingest command template is empty".into()))?;
        let args: Vec<String> = parts.collect();

        let has_placeholder = program.contains(TASK_PLACEHOLDER)
            || args.iter().any(|a| a.contains(TASK_PLACEHOLDER));
        if !has_placeholder {
            return Err(CoreError::Validation(format!(
                "Ingest command template '{template}' must contain {TASK_PLACEHOLDER}"
            )));
        }

        Ok(Self {
            program,
            args,
            envs: Vec::new(),
        })
    }

    /// Set an environment variable for every task built from this template.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Build the task for `name`.
    pub fn task(&self, name: &str, timeout: Duration) -> CommandTask {
        let mut task = CommandTask::new(
            name,
            self.program.replace(TASK_PLACEHOLDER, name),
            self.args
                .iter()
                .map(|a| a.replace(TASK_PLACEHOLDER, name))
                .collect(),
            timeout,
        );
        for (key, value) in &self.envs {
            task = task.with_env(key.clone(), value.clone());
        }
        task
    }

    /// Registry with one command task per name, in order.
    pub fn registry(&self, names: &[&str], timeout: Duration) -> Result<TaskRegistry, CoreError> {
        let mut registry = TaskRegistry::new();
        for name in names {
            registry.register(Arc::new(self.task(name, timeout)))?;
        }
        Ok(registry)
    }
}

impl Default for CommandTemplate {
    fn default() -> Self {
        Self {
            program: "python3".into(),
            args: vec!["scripts/{task}.py".into()],
            envs: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// CommandTask
// ---------------------------------------------------------------------------

/// Runs one external ingestion program.
#[derive(Debug, Clone)]
pub struct CommandTask {
    name: String,
    program: String,
    args: Vec<String>,
    envs: Vec<(String, String)>,
    timeout: Duration,
}

impl CommandTask {
    pub fn new(
        name: impl Into<String>,
        program: impl Into<String>,
        args: Vec<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args,
            envs: Vec::new(),
            timeout,
        }
    }

    /// Add an environment variable on top of the worker's own environment.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Command line as shown in logs and failure text.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl IngestTask for CommandTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> TaskOutcome {
        let start = Instant::now();
        let command_line = self.command_line();

        tracing::info!(task = %self.name, command = %command_line, "Executing ingestion command");

        let result = tokio::time::timeout(
            self.timeout,
            Command::new(&self.program)
                .args(&self.args)
                .envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                .stdin(Stdio::null())
                .stdout(Stdio::inherit())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output(),
        )
        .await;

        let elapsed_ms = start.elapsed().as_millis() as u64;

        if let Ok(Ok(output)) = &result {
            forward_script_log(&self.name, &output.stderr);
        }

        match result {
            Ok(Ok(output)) if output.status.success() => {
                tracing::info!(task = %self.name, elapsed_ms, "Ingestion command succeeded");
                TaskOutcome::Succeeded(TaskStats::default())
            }
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let code = output
                    .status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string());
                tracing::error!(
                    task = %self.name,
                    elapsed_ms,
                    exit = %code,
                    "Ingestion command failed"
                );
                TaskOutcome::Failed(format!(
                    "Command `{command_line}` exited with status {code}:\n{}",
                    stderr.trim()
                ))
            }
            Ok(Err(e)) => {
                tracing::error!(task = %self.name, error = %e, "Ingestion command could not start");
                TaskOutcome::Failed(format!("Failed to execute `{command_line}`: {e}"))
            }
            Err(_) => {
                tracing::error!(task = %self.name, "Ingestion command timed out");
                TaskOutcome::Failed(format!(
                    "Command `{command_line}` timed out after {}s",
                    self.timeout.as_secs()
                ))
            }
        }
    }
}

/// Re-emit a script's stderr through `tracing`. Returns the number of
/// non-blank lines forwarded.
fn forward_script_log(task: &str, stderr: &[u8]) -> usize {
    let text = String::from_utf8_lossy(stderr);
    let mut forwarded = 0;
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        tracing::info!(task, "{line}");
        forwarded += 1;
    }
    forwarded
}
