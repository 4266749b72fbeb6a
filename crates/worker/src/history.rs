//! Text rendering for `nucdb-worker history`.

use nucdb_db::models::data_change::DataChange;
use nucdb_db::models::run_log::RunLog;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One summary line per run.
pub fn format_run(run: &RunLog) -> String {
    let finished = run
        .finished_at
        .map(|t| t.format(TIME_FORMAT).to_string())
        .unwrap_or_else(|| "-".into());

    let mut line = format!(
        "#{:<5} {:<24} {:<8} {} -> {}  processed={} inserted={} updated={}",
        run.id,
        run.script_name,
        run.status,
        run.started_at.format(TIME_FORMAT),
        finished,
        run.records_processed,
        run.records_inserted,
        run.records_updated,
    );

    if let Some(error) = &run.error_message {
        let last_line = error.lines().last().unwrap_or_default();
        line.push_str(&format!("\n       error: {last_line}"));
    }

    line
}

/// Indented change line shown under its run.
pub fn format_change(change: &DataChange) -> String {
    format!(
        "       {} #{}: {} changed from '{}' to '{}'",
        change.entity_type,
        change.entity_id,
        change.field_name,
        change.old_value.as_deref().unwrap_or("None"),
        change.new_value.as_deref().unwrap_or("None"),
    )
}
