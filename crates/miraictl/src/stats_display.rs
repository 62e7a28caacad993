//! Rendering of `miraictl show` and `miraictl stats`

use chrono::{DateTime, Utc};
use mirai_common::{HistoryStats, StateRecord};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::fmt::Write;

/// Combined view printed by `stats --format json`
#[derive(Debug, Serialize)]
pub struct StatsReport<'a> {
    pub state: &'a StateRecord,
    pub history: &'a HistoryStats,
}

fn ts(value: Option<DateTime<Utc>>) -> String {
    value.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".to_string())
}

fn opt(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

/// Print key-value pair
fn kv(out: &mut String, key: &str, value: &str) {
    let _ = writeln!(out, "  {:20} {}", key, value);
}

pub fn render_state_text(path: &str, record: &StateRecord, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", format!("Auto-fix state ({})", path).bold());

    let retry = if record.retry_required {
        "yes".red().to_string()
    } else {
        "no".green().to_string()
    };
    kv(&mut out, "run_count", &record.run_count.to_string());
    kv(&mut out, "retry_required", &retry);
    kv(&mut out, "last_error_id", &opt(record.last_error_id.as_deref()));
    kv(&mut out, "last_error_summary", &opt(record.last_error_summary.as_deref()));
    kv(&mut out, "last_attempt_at", &ts(record.last_attempt_at));

    let cooldown = match record.cooldown_remaining(now) {
        Some(secs) => format!("{} ({}s left)", ts(record.cooldown_until), secs)
            .yellow()
            .to_string(),
        None => ts(record.cooldown_until),
    };
    kv(&mut out, "cooldown_until", &cooldown);
    kv(&mut out, "updated_at", &ts(record.updated_at));
    out
}

pub fn render_stats_text(record: &StateRecord, stats: &HistoryStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "Auto-fix statistics".bold());
    kv(&mut out, "cycles", &record.run_count.to_string());
    kv(&mut out, "history_entries", &stats.total_entries.to_string());
    kv(&mut out, "attempts", &stats.attempts.to_string());
    kv(&mut out, "fixed", &stats.fixed.green().to_string());
    kv(&mut out, "failed", &stats.failed.red().to_string());
    kv(
        &mut out,
        "skipped",
        &format!(
            "{} disabled, {} cooldown, {} retries exhausted",
            stats.skipped_disabled, stats.skipped_cooldown, stats.skipped_retries
        ),
    );
    kv(&mut out, "success_rate", &format!("{:.1}%", stats.success_rate));
    kv(&mut out, "first_entry", &ts(stats.first_entry));
    kv(&mut out, "last_entry", &ts(stats.last_entry));

    if !stats.by_error.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "  {:24} {:>8} {:>8} {:>8} {:>8}",
            "Error", "Attempts", "Fixed", "Failed", "Skipped"
        );
        let _ = writeln!(out, "  {}", "-".repeat(60).dimmed());
        for (id, e) in &stats.by_error {
            let _ = writeln!(
                out,
                "  {:24} {:>8} {:>8} {:>8} {:>8}",
                id, e.attempts, e.fixed, e.failed, e.skipped
            );
        }
    }
    out
}

/// `metric,value` rows; per-error counters use `error.<id>.<counter>` keys
pub fn render_stats_csv(record: &StateRecord, stats: &HistoryStats) -> String {
    let mut rows: Vec<(String, String)> = vec![
        ("run_count".into(), record.run_count.to_string()),
        ("retry_required".into(), record.retry_required.to_string()),
        ("last_error_id".into(), record.last_error_id.clone().unwrap_or_default()),
        (
            "last_attempt_at".into(),
            record.last_attempt_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
        ),
        (
            "cooldown_until".into(),
            record.cooldown_until.map(|t| t.to_rfc3339()).unwrap_or_default(),
        ),
        ("history_entries".into(), stats.total_entries.to_string()),
        ("attempts".into(), stats.attempts.to_string()),
        ("fixed".into(), stats.fixed.to_string()),
        ("failed".into(), stats.failed.to_string()),
        ("skipped_disabled".into(), stats.skipped_disabled.to_string()),
        ("skipped_cooldown".into(), stats.skipped_cooldown.to_string()),
        ("skipped_retries".into(), stats.skipped_retries.to_string()),
        ("success_rate".into(), format!("{:.1}", stats.success_rate)),
    ];
    for (id, e) in &stats.by_error {
        rows.push((format!("error.{}.attempts", id), e.attempts.to_string()));
        rows.push((format!("error.{}.fixed", id), e.fixed.to_string()));
        rows.push((format!("error.{}.failed", id), e.failed.to_string()));
        rows.push((format!("error.{}.skipped", id), e.skipped.to_string()));
    }

    let mut out = String::from("metric,value\n");
    for (key, value) in rows {
        let _ = writeln!(out, "{},{}", csv_field(&key), csv_field(&value));
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains(&[',', '"', '\n'][..]) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirai_common::{FixOutcome, FixResult};

    fn stats() -> HistoryStats {
        HistoryStats::from_entries(&[
            FixResult::new("db_locked", FixOutcome::Fixed, "ok"),
            FixResult::new("db_locked", FixOutcome::Cooldown, "later"),
            FixResult::new("disk_full", FixOutcome::Failed, "no"),
        ])
    }

    #[test]
    fn test_csv_layout() {
        let csv = render_stats_csv(&StateRecord::default(), &stats());
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "metric,value");
        assert!(lines.contains(&"run_count,0"));
        assert!(lines.contains(&"attempts,2"));
        assert!(lines.contains(&"success_rate,50.0"));
        assert!(lines.contains(&"error.db_locked.skipped,1"));
        assert!(lines.iter().skip(1).all(|l| l.split(',').count() == 2));
    }

    #[test]
    fn test_csv_quotes_commas() {
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\", ok"), "\"say \"\"hi\"\", ok\"");
        assert_eq!(csv_field("plain"), "plain");
    }

    #[test]
    fn test_text_lists_errors() {
        let text = render_stats_text(&StateRecord::default(), &stats());
        assert!(text.contains("db_locked"));
        assert!(text.contains("disk_full"));
        assert!(text.contains("50.0%"));
    }

    #[test]
    fn test_state_text_shows_fields() {
        let text = render_state_text("state.json", &StateRecord::default(), Utc::now());
        assert!(text.contains("run_count"));
        assert!(text.contains("retry_required"));
        assert!(text.contains("cooldown_until"));
    }
}
