//! Append-only fix history log (JSON lines, one `FixResult` per line).

use crate::error::Result;
use crate::types::{FixOutcome, FixResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append results, one JSON object per line
    pub fn append(&self, results: &[FixResult]) -> Result<()> {
        if results.is_empty() {
            return Ok(());
        }
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        for result in results {
            let line = serde_json::to_string(result)? + "\n";
            file.write_all(line.as_bytes())?;
        }
        file.sync_all()?;
        Ok(())
    }

    /// Read every entry; malformed lines are skipped
    pub fn read_all(&self) -> Result<Vec<FixResult>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = fs::File::open(&self.path)?;
        let mut entries = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<FixResult>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(
                    "Skipping malformed history line {} in {}: {}",
                    idx + 1,
                    self.path.display(),
                    e
                ),
            }
        }
        Ok(entries)
    }
}

/// Per-error counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorStats {
    pub attempts: u64,
    pub fixed: u64,
    pub failed: u64,
    pub skipped: u64,
}

/// Aggregate view over the fix history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryStats {
    pub total_entries: u64,
    pub attempts: u64,
    pub fixed: u64,
    pub failed: u64,
    pub skipped_disabled: u64,
    pub skipped_cooldown: u64,
    pub skipped_retries: u64,
    /// Percent of attempts that fixed the error
    pub success_rate: f64,
    pub first_entry: Option<DateTime<Utc>>,
    pub last_entry: Option<DateTime<Utc>>,
    pub by_error: BTreeMap<String, ErrorStats>,
}

impl HistoryStats {
    pub fn from_entries(entries: &[FixResult]) -> Self {
        let mut stats = Self::default();

        for entry in entries {
            stats.total_entries += 1;
            let per_error = stats.by_error.entry(entry.error_id.clone()).or_default();

            match entry.outcome {
                FixOutcome::Fixed => {
                    stats.fixed += 1;
                    per_error.fixed += 1;
                }
                FixOutcome::Failed => {
                    stats.failed += 1;
                    per_error.failed += 1;
                }
                FixOutcome::Disabled => stats.skipped_disabled += 1,
                FixOutcome::Cooldown => stats.skipped_cooldown += 1,
                FixOutcome::RetriesExhausted => stats.skipped_retries += 1,
            }
            if entry.outcome.attempted() {
                stats.attempts += 1;
                per_error.attempts += 1;
            } else {
                per_error.skipped += 1;
            }

            stats.first_entry = Some(match stats.first_entry {
                Some(first) if first <= entry.timestamp => first,
                _ => entry.timestamp,
            });
            stats.last_entry = Some(match stats.last_entry {
                Some(last) if last >= entry.timestamp => last,
                _ => entry.timestamp,
            });
        }

        if stats.attempts > 0 {
            stats.success_rate = (stats.fixed as f64 / stats.attempts as f64) * 100.0;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_append_and_read() {
        let dir = TempDir::new().unwrap();
        let log = HistoryLog::new(dir.path().join("history.jsonl"));
        assert!(log.read_all().unwrap().is_empty());

        log.append(&[
            FixResult::new("a", FixOutcome::Fixed, "ok"),
            FixResult::new("b", FixOutcome::Failed, "boom"),
        ])
        .unwrap();
        log.append(&[FixResult::new("a", FixOutcome::Cooldown, "cooldown")])
            .unwrap();

        let entries = log.read_all().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].error_id, "b");
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.jsonl");
        let log = HistoryLog::new(&path);
        log.append(&[FixResult::new("a", FixOutcome::Fixed, "ok")])
            .unwrap();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "not json").unwrap();

        assert_eq!(log.read_all().unwrap().len(), 1);
    }

    #[test]
    fn test_stats() {
        let entries = vec![
            FixResult::new("a", FixOutcome::Fixed, ""),
            FixResult::new("a", FixOutcome::Failed, ""),
            FixResult::new("a", FixOutcome::Cooldown, ""),
            FixResult::new("b", FixOutcome::Disabled, ""),
            FixResult::new("b", FixOutcome::Fixed, ""),
        ];
        let stats = HistoryStats::from_entries(&entries);

        assert_eq!(stats.total_entries, 5);
        assert_eq!(stats.attempts, 3);
        assert_eq!(stats.fixed, 2);
        assert_eq!(stats.skipped_cooldown, 1);
        assert_eq!(stats.skipped_disabled, 1);
        assert!((stats.success_rate - 66.666).abs() < 0.01);
        assert_eq!(stats.by_error["a"].attempts, 2);
        assert_eq!(stats.by_error["b"].skipped, 1);
        assert!(stats.first_entry.unwrap() <= stats.last_entry.unwrap());
    }
}
