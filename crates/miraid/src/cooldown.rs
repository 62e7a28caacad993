//! Fix history: last successful attempt per error id and consecutive failures.
//!
//! Owned by the daemon; entries are never pruned during a run.

use chrono::{DateTime, Duration, Utc};
use mirai_common::MAX_COOLDOWN_SECS;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct FixHistory {
    cooldown: Duration,
    last_attempt: HashMap<String, DateTime<Utc>>,
    failures: HashMap<String, u32>,
}

impl FixHistory {
    /// Windows longer than `MAX_COOLDOWN_SECS` are clamped
    pub fn new(cooldown_secs: u64) -> Self {
        Self {
            cooldown: Duration::seconds(cooldown_secs.min(MAX_COOLDOWN_SECS) as i64),
            last_attempt: HashMap::new(),
            failures: HashMap::new(),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// `now - last_attempt < cooldown`
    pub fn is_in_cooldown_at(&self, error_id: &str, now: DateTime<Utc>) -> bool {
        self.last_attempt
            .get(error_id)
            .map(|last| now.signed_duration_since(*last) < self.cooldown)
            .unwrap_or(false)
    }

    pub fn is_in_cooldown(&self, error_id: &str) -> bool {
        self.is_in_cooldown_at(error_id, Utc::now())
    }

    pub fn last_attempt(&self, error_id: &str) -> Option<DateTime<Utc>> {
        self.last_attempt.get(error_id).copied()
    }

    /// When the cooldown for `error_id` ends, if it has one
    pub fn cooldown_until(&self, error_id: &str) -> Option<DateTime<Utc>> {
        self.last_attempt(error_id)
            .and_then(|at| at.checked_add_signed(self.cooldown))
    }

    /// Re-create a cooldown ending at `until`, e.g. from the persisted state
    pub fn restore(&mut self, error_id: &str, until: DateTime<Utc>) {
        if let Some(at) = until.checked_sub_signed(self.cooldown) {
            self.record_success(error_id, at);
        }
    }

    /// A successful fix starts the cooldown window and clears failures
    pub fn record_success(&mut self, error_id: &str, at: DateTime<Utc>) {
        self.last_attempt.insert(error_id.to_string(), at);
        self.failures.remove(error_id);
    }

    /// Returns the consecutive failure count after this failure
    pub fn record_failure(&mut self, error_id: &str) -> u32 {
        let count = self.failures.entry(error_id.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn failures(&self, error_id: &str) -> u32 {
        self.failures.get(error_id).copied().unwrap_or(0)
    }

}
