//! Integration tests for the task orchestrator and diff engine.
//!
//! Each test builds an in-memory store with the ledger migrations plus the
//! watched `reactors` and `sites` tables, then drives the orchestrator with
//! tasks that write to the store directly.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use nucdb_core::run_status::RunStatus;
use nucdb_core::task::{TaskOutcome, TaskStats};
use nucdb_core::watch::WatchedFieldRegistry;
use nucdb_db::DbPool;
use nucdb_events::{NotificationMessage, Notifier};
use nucdb_pipeline::{
    DiffEngine, IngestTask, OrchestratorOptions, PipelineError, RunLedger, TaskOrchestrator,
    TaskRegistry,
};
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

async fn store() -> DbPool {
    let pool = nucdb_db::create_memory_pool().await.unwrap();
    nucdb_db::run_migrations(&pool).await.unwrap();

    for ddl in [
        "CREATE TABLE reactors (\
             id INTEGER PRIMARY KEY, name TEXT NOT NULL, status TEXT, \
             license_expiration_date TEXT, capacity_mw REAL, permanent_shutdown_date TEXT)",
        "CREATE TABLE sites (\
             id INTEGER PRIMARY KEY, name TEXT NOT NULL, site_type TEXT, \
             owner TEXT, operator TEXT, total_capacity_mw REAL)",
        "INSERT INTO reactors (id, name, status, capacity_mw) VALUES \
             (1, 'Palisades', 'operating', 800.0), \
             (2, 'Vogtle 3', 'operating', 1117.0)",
        "INSERT INTO sites (id, name, site_type, owner) VALUES \
             (1, 'Palisades', 'power', 'Holtec')",
    ] {
        sqlx::query(ddl).execute(&pool).await.unwrap();
    }

    pool
}

/// Runs SQL against the store and reports fixed counters.
struct SqlTask {
    name: &'static str,
    pool: DbPool,
    statements: Vec<&'static str>,
    stats: TaskStats,
}

#[async_trait]
impl IngestTask for SqlTask {
    fn name(&self) -> &str {
        self.name
    }

    async fn run(&self) -> TaskOutcome {
        for sql in &self.statements {
            if let Err(e) = sqlx::query(sql).execute(&self.pool).await {
                return TaskOutcome::Failed(e.to_string());
            }
        }
        TaskOutcome::Succeeded(self.stats)
    }
}

struct FailingTask {
    name: &'static str,
    error: &'static str,
}

#[async_trait]
impl IngestTask for FailingTask {
    fn name(&self) -> &str {
        self.name
    }

    async fn run(&self) -> TaskOutcome {
        TaskOutcome::Failed(self.error.to_string())
    }
}

/// Reports counters the ledger refuses (negative) on its first `bad_runs`
/// calls, then valid ones.
struct RejectedStatsTask {
    name: &'static str,
    bad_runs: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl IngestTask for RejectedStatsTask {
    fn name(&self) -> &str {
        self.name
    }

    async fn run(&self) -> TaskOutcome {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.bad_runs {
            TaskOutcome::Succeeded(TaskStats::new(-1, 0, 0))
        } else {
            TaskOutcome::Succeeded(TaskStats::new(1, 0, 0))
        }
    }
}

#[derive(Default)]
struct RecordingNotifier(Mutex<Vec<NotificationMessage>>);

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: NotificationMessage) {
        self.0.lock().unwrap().push(message);
    }
}

impl RecordingNotifier {
    fn messages(&self) -> Vec<NotificationMessage> {
        self.0.lock().unwrap().clone()
    }
}

fn shared<T: IngestTask + 'static>(task: T) -> Arc<dyn IngestTask> {
    Arc::new(task)
}

fn sql_task(
    name: &'static str,
    pool: &DbPool,
    statements: Vec<&'static str>,
) -> Arc<dyn IngestTask> {
    shared(SqlTask {
        name,
        pool: pool.clone(),
        statements,
        stats: TaskStats::default(),
    })
}

struct Harness {
    ledger: RunLedger,
    diff: DiffEngine,
    notifier: Arc<RecordingNotifier>,
}

impl Harness {
    fn new(pool: &DbPool) -> Self {
        let ledger = RunLedger::new(pool.clone());
        let diff = DiffEngine::new(
            pool.clone(),
            Arc::new(WatchedFieldRegistry::default_registry()),
            ledger.clone(),
        );
        Self {
            ledger,
            diff,
            notifier: Arc::new(RecordingNotifier::default()),
        }
    }

    fn orchestrator(&self, tasks: TaskRegistry, options: OrchestratorOptions) -> TaskOrchestrator {
        TaskOrchestrator::new(
            self.ledger.clone(),
            self.diff.clone(),
            tasks,
            self.notifier.clone(),
            options,
        )
    }
}

fn registry(tasks: Vec<Arc<dyn IngestTask>>) -> TaskRegistry {
    let mut registry = TaskRegistry::new();
    for task in tasks {
        registry.register(task).unwrap();
    }
    registry
}

// ---------------------------------------------------------------------------
// Run lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn successful_task_finishes_run_with_counters() {
    let pool = store().await;
    let h = Harness::new(&pool);
    let task = shared(SqlTask {
        name: "ingest_trust_funds",
        pool: pool.clone(),
        statements: vec![],
        stats: TaskStats::new(12, 4, 2),
    });

    let summary = h
        .orchestrator(registry(vec![task]), OrchestratorOptions::default())
        .run_once()
        .await
        .unwrap();
    assert_eq!((summary.succeeded, summary.failed), (1, 0));

    let runs = h.ledger.list_recent_runs(10).await.unwrap();
    assert_eq!(runs.len(), 1);
    let run = &runs[0];
    assert_eq!(run.script_name, "ingest_trust_funds");
    assert_eq!(run.run_status().unwrap(), RunStatus::Success);
    assert!(run.finished_at.is_some());
    assert_eq!(
        (run.records_processed, run.records_inserted, run.records_updated),
        (12, 4, 2)
    );
    assert!(h.notifier.messages().is_empty());
}

#[tokio::test]
async fn failing_task_records_error_and_notifies_once() {
    let pool = store().await;
    let h = Harness::new(&pool);
    let error = "Traceback (most recent call last):\n  ...\nConnectionError: NRC site down";

    let summary = h
        .orchestrator(
            registry(vec![shared(FailingTask {
                name: "ingest_nrc_events",
                error,
            })]),
            OrchestratorOptions::default(),
        )
        .run_once()
        .await
        .unwrap();
    assert_eq!((summary.succeeded, summary.failed), (0, 1));

    let runs = h.ledger.list_recent_runs(1).await.unwrap();
    let run = &runs[0];
    assert_eq!(run.run_status().unwrap(), RunStatus::Failure);
    assert_eq!(run.error_message.as_deref(), Some(error));
    assert!(run.finished_at.is_some());

    let messages = h.notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].subject.contains("ingest_nrc_events"));
    assert!(messages[0].body.contains(error));
}

#[tokio::test]
async fn failure_does_not_stop_later_tasks() {
    let pool = store().await;
    let h = Harness::new(&pool);
    let tasks = registry(vec![
        shared(FailingTask {
            name: "ingest_nrc_reactors",
            error: "boom",
        }),
        sql_task(
            "ingest_decommissioning",
            &pool,
            vec!["UPDATE reactors SET status = 'decommissioning' WHERE id = 1"],
        ),
    ]);

    let summary = h
        .orchestrator(tasks, OrchestratorOptions::default())
        .run_once()
        .await
        .unwrap();

    assert_eq!((summary.succeeded, summary.failed), (1, 1));
    assert_eq!(summary.changes.len(), 1);

    let statuses: Vec<(String, String)> = h
        .ledger
        .list_recent_runs(10)
        .await
        .unwrap()
        .into_iter()
        .rev()
        .map(|r| (r.script_name, r.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("ingest_nrc_reactors".to_string(), "failure".to_string()),
            ("ingest_decommissioning".to_string(), "success".to_string()),
        ]
    );

    let subjects: Vec<String> = h.notifier.messages().into_iter().map(|m| m.subject).collect();
    assert_eq!(
        subjects,
        vec![
            "Nuclear DB: Script Failure - ingest_nrc_reactors".to_string(),
            "Nuclear DB: Data Changes Detected".to_string(),
        ]
    );
}

// ---------------------------------------------------------------------------
// Change detection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_change_is_detected_recorded_and_reported() {
    let pool = store().await;
    let h = Harness::new(&pool);
    let tasks = registry(vec![sql_task(
        "ingest_nrc_reactors",
        &pool,
        vec!["UPDATE reactors SET status = 'decommissioned' WHERE id = 1"],
    )]);

    let summary = h
        .orchestrator(tasks, OrchestratorOptions::default())
        .run_once()
        .await
        .unwrap();

    assert_eq!(summary.changes.len(), 1);
    let change = &summary.changes[0];
    assert_eq!(change.entity_type, "reactor");
    assert_eq!(change.entity_id, 1);
    assert_eq!(change.field, "status");
    assert_eq!(change.old_value.as_deref(), Some("operating"));
    assert_eq!(change.new_value.as_deref(), Some("decommissioned"));

    let runs = h.ledger.list_recent_runs(1).await.unwrap();
    let run = &runs[0];
    let stored = h.ledger.list_changes_for_run(run.id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].field_name, "status");

    let messages = h.notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0]
        .body
        .contains("reactor #1: status changed from 'operating' to 'decommissioned'"));
}

#[tokio::test]
async fn inserted_entities_are_not_changes() {
    let pool = store().await;
    let h = Harness::new(&pool);
    let tasks = registry(vec![sql_task(
        "ingest_nrc_reactors",
        &pool,
        vec![
            "INSERT INTO reactors (id, name, status, capacity_mw) \
             VALUES (3, 'Kairos', 'planned', 35.0)",
            "INSERT INTO sites (id, name, site_type, owner) \
             VALUES (2, 'Oak Ridge', 'research', 'DOE')",
        ],
    )]);

    let summary = h
        .orchestrator(tasks, OrchestratorOptions::default())
        .run_once()
        .await
        .unwrap();

    assert!(summary.changes.is_empty());
    assert!(h.notifier.messages().is_empty());
}

#[tokio::test]
async fn numeric_rewrite_with_same_value_is_not_a_change() {
    let pool = store().await;
    let h = Harness::new(&pool);
    let tasks = registry(vec![sql_task(
        "ingest_nrc_reactors",
        &pool,
        vec!["UPDATE reactors SET capacity_mw = 800.0, status = 'operating' WHERE id = 1"],
    )]);

    let summary = h
        .orchestrator(tasks, OrchestratorOptions::default())
        .run_once()
        .await
        .unwrap();
    assert!(summary.changes.is_empty());
}

#[tokio::test]
async fn changes_from_all_tasks_are_sent_together() {
    let pool = store().await;
    let h = Harness::new(&pool);
    let tasks = registry(vec![
        sql_task(
            "ingest_nrc_reactors",
            &pool,
            vec!["UPDATE reactors SET capacity_mw = 1150.0 WHERE id = 2"],
        ),
        sql_task(
            "ingest_decommissioning",
            &pool,
            vec!["UPDATE sites SET owner = NULL WHERE id = 1"],
        ),
    ]);

    let summary = h
        .orchestrator(tasks, OrchestratorOptions::default())
        .run_once()
        .await
        .unwrap();
    assert_eq!(summary.changes.len(), 2);

    let messages = h.notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].body.starts_with("2 data change(s) detected:"));
    assert!(messages[0]
        .body
        .contains("reactor #2: capacity_mw changed from '1117.0' to '1150.0'"));
    assert!(messages[0]
        .body
        .contains("site #1: owner changed from 'Holtec' to 'None'"));
}

#[tokio::test]
async fn detect_changes_is_idempotent_without_mutation() {
    let pool = store().await;
    let h = Harness::new(&pool);
    let run_id = h.ledger.start_run("manual").await.unwrap();

    let before = h.diff.take_snapshot().await.unwrap();
    assert_eq!(before.entity_count(), 3);

    assert!(h.diff.detect_changes(&before, run_id).await.unwrap().is_empty());
    assert!(h.diff.detect_changes(&before, run_id).await.unwrap().is_empty());
    assert!(h.ledger.list_changes_for_run(run_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn snapshot_failure_fails_the_run() {
    let pool = store().await;
    sqlx::query("DROP TABLE sites").execute(&pool).await.unwrap();
    let h = Harness::new(&pool);

    let summary = h
        .orchestrator(
            registry(vec![sql_task("ingest_usaspending", &pool, vec![])]),
            OrchestratorOptions::default(),
        )
        .run_once()
        .await
        .unwrap();
    assert_eq!(summary.failed, 1);

    let runs = h.ledger.list_recent_runs(1).await.unwrap();
    let run = &runs[0];
    assert_eq!(run.run_status().unwrap(), RunStatus::Failure);
    assert!(run
        .error_message
        .as_deref()
        .unwrap()
        .contains("Failed to scan watched table 'sites'"));
    assert_eq!(h.notifier.messages().len(), 1);
}

// ---------------------------------------------------------------------------
// Options and scheduling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn success_notification_only_when_enabled_and_rows_written() {
    let pool = store().await;
    let h = Harness::new(&pool);
    let tasks = registry(vec![
        shared(SqlTask {
            name: "ingest_adams",
            pool: pool.clone(),
            statements: vec![],
            stats: TaskStats::new(5, 0, 0),
        }),
        shared(SqlTask {
            name: "ingest_trust_funds",
            pool: pool.clone(),
            statements: vec![],
            stats: TaskStats::new(5, 1, 0),
        }),
    ]);

    h.orchestrator(tasks, OrchestratorOptions { notify_on_success: true })
        .run_once()
        .await
        .unwrap();

    let subjects: Vec<String> = h.notifier.messages().into_iter().map(|m| m.subject).collect();
    assert_eq!(subjects, vec!["Nuclear DB: ingest_trust_funds completed".to_string()]);
}

#[tokio::test]
async fn continuous_mode_runs_immediately_and_stops_on_cancel() {
    let pool = store().await;
    let h = Harness::new(&pool);
    let orchestrator = Arc::new(h.orchestrator(
        registry(vec![sql_task("ingest_nrc_events", &pool, vec![])]),
        OrchestratorOptions::default(),
    ));

    let cancel = CancellationToken::new();
    let handle = {
        let orchestrator = Arc::clone(&orchestrator);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            orchestrator
                .run_continuous(Duration::from_secs(3600), cancel)
                .await;
        })
    };

    let mut runs = Vec::new();
    for _ in 0..200 {
        runs = h.ledger.list_recent_runs(10).await.unwrap();
        if runs.iter().any(|r| r.status != "started") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("scheduler should stop after cancel")
        .unwrap();

    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, "success");
}

#[tokio::test]
async fn ledger_error_aborts_the_pass() {
    let pool = store().await;
    let h = Harness::new(&pool);
    let tasks = registry(vec![
        shared(RejectedStatsTask {
            name: "ingest_trust_funds",
            bad_runs: 1,
            calls: AtomicUsize::new(0),
        }),
        sql_task(
            "ingest_nrc_reactors",
            &pool,
            vec!["UPDATE reactors SET status = 'decommissioned' WHERE id = 1"],
        ),
    ]);

    let result = h
        .orchestrator(tasks, OrchestratorOptions::default())
        .run_once()
        .await;
    assert_matches!(result, Err(PipelineError::Ledger(_)));

    // The second task never started and its write never happened.
    let runs = h.ledger.list_recent_runs(10).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].script_name, "ingest_trust_funds");
    assert_eq!(runs[0].status, "started");

    let status: String = sqlx::query_scalar("SELECT status FROM reactors WHERE id = 1")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(status, "operating");
    assert!(h.notifier.messages().is_empty());
}

#[tokio::test]
async fn continuous_mode_survives_an_aborted_pass() {
    let pool = store().await;
    let h = Harness::new(&pool);
    let orchestrator = Arc::new(h.orchestrator(
        registry(vec![shared(RejectedStatsTask {
            name: "ingest_trust_funds",
            bad_runs: 1,
            calls: AtomicUsize::new(0),
        })]),
        OrchestratorOptions::default(),
    ));

    let cancel = CancellationToken::new();
    let handle = {
        let orchestrator = Arc::clone(&orchestrator);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            orchestrator
                .run_continuous(Duration::from_millis(50), cancel)
                .await;
        })
    };

    let mut runs = Vec::new();
    for _ in 0..300 {
        runs = h.ledger.list_recent_runs(10).await.unwrap();
        if runs.iter().any(|r| r.status == "success") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("scheduler should stop after cancel")
        .unwrap();

    let oldest = runs.last().expect("at least one run");
    assert_eq!(oldest.status, "started");
    assert!(runs.iter().any(|r| r.status == "success"));
}
