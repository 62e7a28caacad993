//! Command execution
//!
//! Each command returns the process exit code; unexpected failures bubble
//! up as errors and map to `EXIT_GENERAL_ERROR` in main.

use crate::cli::StatsFormat;
use crate::errors::{EXIT_REFUSED, EXIT_SUCCESS, EXIT_VALIDATION_FAILED};
use crate::stats_display::{render_state_text, render_stats_csv, render_stats_text, StatsReport};
use anyhow::{Context, Result};
use chrono::Utc;
use mirai_common::{AutofixError, HistoryLog, HistoryStats, PatternDocument, StateStore};
use owo_colors::OwoColorize;
use std::path::Path;

pub fn init(store: &StateStore, force: bool) -> Result<i32> {
    match store.init(force) {
        Ok(_) => {
            println!("{} Initialized {}", "✓".green(), store.path().display());
            Ok(EXIT_SUCCESS)
        }
        Err(e @ AutofixError::StateExists(_)) => {
            eprintln!("{} {}", "✗".red(), e);
            Ok(EXIT_REFUSED)
        }
        Err(e) => Err(anyhow::Error::new(e).context("Failed to initialize state file")),
    }
}

pub fn show(store: &StateStore, json: bool) -> Result<i32> {
    let record = store
        .load()
        .context("Cannot read state (run `miraictl init` first)")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        print!(
            "{}",
            render_state_text(&store.path().display().to_string(), &record, Utc::now())
        );
    }
    Ok(EXIT_SUCCESS)
}

pub fn reset(store: &StateStore, confirm: bool) -> Result<i32> {
    if !confirm {
        eprintln!(
            "{} Refusing to reset {} without --confirm",
            "✗".red(),
            store.path().display()
        );
        return Ok(EXIT_REFUSED);
    }

    store.reset().context("Failed to reset state file")?;
    println!("{} Reset {}", "✓".green(), store.path().display());
    Ok(EXIT_SUCCESS)
}

pub fn stats(store: &StateStore, history: &HistoryLog, format: StatsFormat) -> Result<i32> {
    let record = store.load_or_default().context("Cannot read state")?;
    let entries = history.read_all().context("Cannot read fix history")?;
    let stats = HistoryStats::from_entries(&entries);

    match format {
        StatsFormat::Text => print!("{}", render_stats_text(&record, &stats)),
        StatsFormat::Json => {
            let report = StatsReport {
                state: &record,
                history: &stats,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        StatsFormat::Csv => print!("{}", render_stats_csv(&record, &stats)),
    }
    Ok(EXIT_SUCCESS)
}

/// Collect validation problems for the state file and an optional pattern
/// document. Empty means valid.
pub fn validation_problems(store: &StateStore, patterns: Option<&Path>) -> Vec<String> {
    let mut problems = Vec::new();

    match store.load() {
        Ok(record) => problems.extend(
            record
                .problems()
                .into_iter()
                .map(|p| format!("state: {}", p)),
        ),
        Err(e) => problems.push(format!("state: {}", e)),
    }

    if let Some(path) = patterns {
        match PatternDocument::load(path) {
            Ok(doc) => {
                for warning in doc.warnings() {
                    eprintln!("{} patterns: {}", "!".yellow(), warning);
                }
            }
            Err(e) => problems.push(format!("patterns: {}", e)),
        }
    }
    problems
}

pub fn validate(store: &StateStore, patterns: Option<&Path>) -> Result<i32> {
    let problems = validation_problems(store, patterns);
    if problems.is_empty() {
        println!("{} Valid", "✓".green());
        return Ok(EXIT_SUCCESS);
    }

    for problem in &problems {
        eprintln!("{} {}", "✗".red(), problem);
    }
    Ok(EXIT_VALIDATION_FAILED)
}
