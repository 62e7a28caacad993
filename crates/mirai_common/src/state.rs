//! Persisted auto-fix state record.
//!
//! Read and written once per daemon cycle; managed by `miraictl`.

use crate::error::{AutofixError, Result};
use crate::patterns::MAX_COOLDOWN_SECS;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// State file contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    /// Last remediation attempt failed and should be retried
    pub retry_required: bool,
    /// Completed daemon cycles
    pub run_count: u64,
    pub last_error_id: Option<String>,
    pub last_error_summary: Option<String>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    /// Cooldown end for `last_error_id`; cleared when that attempt failed
    pub cooldown_until: Option<DateTime<Utc>>,
    /// Unexpired cooldown end per error id
    #[serde(default)]
    pub cooldowns: BTreeMap<String, DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// End of a cooldown window starting at `at`; `None` when out of range
pub fn cooldown_end(at: DateTime<Utc>, cooldown_secs: u64) -> Option<DateTime<Utc>> {
    if cooldown_secs > MAX_COOLDOWN_SECS {
        return None;
    }
    at.checked_add_signed(Duration::seconds(cooldown_secs as i64))
}

impl Default for StateRecord {
    fn default() -> Self {
        Self {
            retry_required: false,
            run_count: 0,
            last_error_id: None,
            last_error_summary: None,
            last_attempt_at: None,
            cooldown_until: None,
            cooldowns: BTreeMap::new(),
            updated_at: None,
        }
    }
}

impl StateRecord {
    /// Record a remediation attempt
    pub fn record_attempt(
        &mut self,
        error_id: &str,
        summary: &str,
        at: DateTime<Utc>,
        success: bool,
        cooldown_secs: u64,
    ) {
        self.last_error_id = Some(error_id.to_string());
        self.last_error_summary = Some(summary.to_string());
        self.last_attempt_at = Some(at);

        let until = if success {
            cooldown_end(at, cooldown_secs)
        } else {
            None
        };
        self.cooldown_until = until;
        match until {
            Some(until) => {
                self.cooldowns.insert(error_id.to_string(), until);
            }
            None => {
                self.cooldowns.remove(error_id);
            }
        }
    }

    /// Drop cooldowns that ended at or before `now`
    pub fn prune_cooldowns(&mut self, now: DateTime<Utc>) {
        self.cooldowns.retain(|_, until| *until > now);
    }

    /// Seconds of cooldown left at `now`, if any
    pub fn cooldown_remaining(&self, now: DateTime<Utc>) -> Option<i64> {
        self.cooldown_until
            .map(|until| (until - now).num_seconds())
            .filter(|secs| *secs > 0)
    }

    /// Internal consistency problems; empty when the record is valid
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.retry_required && self.last_error_id.is_none() {
            problems.push("retry_required is set but last_error_id is empty".to_string());
        }
        if self.last_error_id.is_some() && self.last_attempt_at.is_none() {
            problems.push("last_error_id is set but last_attempt_at is empty".to_string());
        }
        if let Some(id) = &self.last_error_id {
            if id.trim().is_empty() {
                problems.push("last_error_id is blank".to_string());
            }
        }
        if let (Some(attempt), Some(until)) = (self.last_attempt_at, self.cooldown_until) {
            if until < attempt {
                problems.push("cooldown_until is earlier than last_attempt_at".to_string());
            }
        }
        if self.cooldown_until.is_some() && self.last_attempt_at.is_none() {
            problems.push("cooldown_until is set without last_attempt_at".to_string());
        }
        if self.run_count == 0 && self.last_attempt_at.is_some() {
            problems.push("last_attempt_at is set but run_count is 0".to_string());
        }
        problems
    }
}

/// State file at a fixed path
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the record; a missing file yields the initial record
    pub fn load_or_default(&self) -> Result<StateRecord> {
        if !self.path.exists() {
            info!("No state file at {}, starting fresh", self.path.display());
            return Ok(StateRecord::default());
        }
        self.load()
    }

    /// Load the record; a missing file is an error
    pub fn load(&self) -> Result<StateRecord> {
        let contents = fs::read_to_string(&self.path).map_err(|e| AutofixError::State {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        let record: StateRecord =
            serde_json::from_str(&contents).map_err(|e| AutofixError::State {
                path: self.path.clone(),
                reason: format!("invalid state JSON: {}", e),
            })?;
        debug!("Loaded state (run_count={})", record.run_count);
        Ok(record)
    }

    /// Write the record via a temp file and rename
    pub fn save(&self, record: &StateRecord) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }

        let mut record = record.clone();
        record.updated_at = Some(Utc::now());
        let json = serde_json::to_string_pretty(&record)?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;

        debug!("Saved state to {}", self.path.display());
        Ok(())
    }

    /// Create the initial record; refuses to overwrite unless `force`
    pub fn init(&self, force: bool) -> Result<StateRecord> {
        if self.exists() && !force {
            return Err(AutofixError::StateExists(self.path.clone()));
        }
        let record = StateRecord::default();
        self.save(&record)?;
        info!("Initialized state file {}", self.path.display());
        Ok(record)
    }

    /// Restore the initial record
    pub fn reset(&self) -> Result<StateRecord> {
        let record = StateRecord::default();
        self.save(&record)?;
        info!("Reset state file {}", self.path.display());
        Ok(record)
    }

    /// Copy the current state file next to itself as `<name>.bak`
    pub fn backup(&self) -> Result<Option<PathBuf>> {
        if !self.exists() {
            return Ok(None);
        }
        let mut name = self.path.as_os_str().to_owned();
        name.push(".bak");
        let backup = PathBuf::from(name);
        fs::copy(&self.path, &backup)?;
        debug!("Backed up state to {}", backup.display());
        Ok(Some(backup))
    }
}
