//! Auto-fix daemon: detection cycle and main loop
//!
//! Each cycle runs the health battery, scans the configured logs, remediates
//! eligible detections and persists the state record. Cycles never overlap;
//! the running flag is only checked between cycles.

use crate::config::DaemonConfig;
use crate::cooldown::FixHistory;
use crate::health::HealthMonitor;
use crate::repair;
use crate::scanner::LogScanner;
use anyhow::{Context, Result};
use chrono::Utc;
use mirai_common::{
    Action, ActionResult, AutoFixConfig, CycleReport, DetectedError, FixOutcome, FixResult,
    HistoryLog, PatternDocument, PatternSet, StateRecord, StateStore,
};
use std::collections::{HashMap, HashSet};
use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

/// Stops a running daemon after its current cycle
#[derive(Clone)]
pub struct ShutdownHandle {
    running: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl ShutdownHandle {
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.wake.notify_one();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

pub struct AutoFixDaemon {
    config: DaemonConfig,
    policy: AutoFixConfig,
    scanner: LogScanner,
    health: HealthMonitor,
    history: FixHistory,
    state: StateStore,
    record: StateRecord,
    history_log: HistoryLog,
    /// Detections from ad hoc sources, consumed by the next cycle
    adhoc: Vec<DetectedError>,
    shutdown: ShutdownHandle,
}

impl AutoFixDaemon {
    /// Load the pattern document named by the config and build the daemon.
    ///
    /// A malformed pattern document is fatal.
    pub fn from_config(config: DaemonConfig) -> Result<Self> {
        let patterns_path = config.patterns_path();
        let document = PatternDocument::load(&patterns_path)
            .with_context(|| format!("Invalid pattern document {}", patterns_path.display()))?;
        for warning in document.warnings() {
            warn!("{}", warning);
        }
        Self::new(config, document)
    }

    pub fn new(config: DaemonConfig, document: PatternDocument) -> Result<Self> {
        document.validate()?;
        let patterns = PatternSet::compile(&document.error_patterns)?;
        let health = HealthMonitor::new(document.health_checks.clone(), &config.project_root)?;
        let policy = document.auto_fix_config.clone();

        let state = StateStore::new(config.state_path());
        let record = state
            .load_or_default()
            .context("Cannot read state file (run `miraictl reset --confirm` to recover)")?;

        let mut history = FixHistory::new(policy.cooldown_period);
        // carry unexpired cooldowns over a restart
        let now = Utc::now();
        for (id, until) in record.cooldowns.iter().filter(|(_, until)| **until > now) {
            debug!("Restoring cooldown for {} until {}", id, until);
            history.restore(id, *until);
        }

        info!(
            "Auto-fix daemon ready: {} patterns, cooldown {}s, max_retries {}, policy {:?}",
            patterns.len(),
            policy.cooldown_period,
            policy.max_retries,
            policy.success_policy
        );

        Ok(Self {
            history_log: HistoryLog::new(config.history_path()),
            scanner: LogScanner::new(patterns),
            health,
            history,
            state,
            record,
            policy,
            config,
            adhoc: Vec::new(),
            shutdown: ShutdownHandle {
                running: Arc::new(AtomicBool::new(false)),
                wake: Arc::new(Notify::new()),
            },
        })
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    pub fn state_record(&self) -> &StateRecord {
        &self.record
    }

    /// Scan the given paths
    pub fn scan_logs<P: AsRef<std::path::Path>>(&self, paths: &[P]) -> Vec<DetectedError> {
        self.scanner.scan_logs(paths)
    }

    /// Scan an ad hoc source (e.g. piped stdin) and queue its detections for
    /// the next cycle. Returns the number queued.
    pub fn queue_source<R: BufRead>(&mut self, reader: R, source: &str) -> io::Result<usize> {
        let found = self.scanner.scan_reader(reader, source)?;
        let count = found.len();
        self.adhoc.extend(found);
        Ok(count)
    }

    pub fn is_in_cooldown(&self, error_id: &str) -> bool {
        self.history.is_in_cooldown(error_id)
    }

    pub fn execute_action(&self, action: &Action) -> ActionResult {
        repair::execute_action(action, &self.config.project_root, None)
    }

    /// Remediate one detection, subject to its auto-fix flag, the cooldown
    /// window and the retry limit.
    pub fn auto_fix_error(&mut self, detected: &DetectedError) -> FixResult {
        let id = detected.id.as_str();

        if !detected.auto_fix {
            info!("Auto-fix disabled for {}, skipping", id);
            return FixResult::new(id, FixOutcome::Disabled, format!("Auto-fix disabled for {}", id));
        }

        if self.history.is_in_cooldown(id) {
            let until = self
                .history
                .cooldown_until(id)
                .map(|t| t.to_rfc3339())
                .unwrap_or_default();
            info!("{} is in cooldown until {}, skipping", id, until);
            return FixResult::new(
                id,
                FixOutcome::Cooldown,
                format!("{} is in cooldown until {}", id, until),
            );
        }

        let failures = self.history.failures(id);
        if self.policy.max_retries > 0 && failures >= self.policy.max_retries {
            warn!("{} failed {} times, not retrying", id, failures);
            return FixResult::new(
                id,
                FixOutcome::RetriesExhausted,
                format!("{} gave up after {} failed attempts", id, failures),
            );
        }

        if self.policy.backup_before_fix {
            if let Err(e) = self.state.backup() {
                warn!("State backup before fixing {} failed: {}", id, e);
            }
        }

        info!("Remediating {} ({} actions)", id, detected.actions.len());
        let results: Vec<ActionResult> = detected
            .actions
            .iter()
            .map(|action| repair::execute_action(action, &self.config.project_root, Some(detected)))
            .collect();
        let oks: Vec<bool> = results.iter().map(|r| r.success).collect();
        let success = self.policy.success_policy.combine(&oks);

        let fix = if success {
            self.history.record_success(id, Utc::now());
            FixResult::new(
                id,
                FixOutcome::Fixed,
                format!(
                    "Fixed {}: {}/{} actions succeeded",
                    id,
                    oks.iter().filter(|ok| **ok).count(),
                    oks.len()
                ),
            )
        } else {
            let failures = self.history.record_failure(id);
            let failed: Vec<String> = results
                .iter()
                .filter(|r| !r.success)
                .map(|r| format!("{}: {}", r.action_type, r.message))
                .collect();
            warn!("Fix for {} failed (attempt {})", id, failures);
            FixResult::new(
                id,
                FixOutcome::Failed,
                format!("Fix for {} failed: {}", id, failed.join("; ")),
            )
        };
        fix.with_actions(results)
    }

    /// One full pass: health checks, log scan, remediation, persistence.
    ///
    /// Always returns a report; persistence failures are logged.
    pub async fn run_detection_cycle(&mut self, cycle: u64) -> CycleReport {
        info!("Starting detection cycle {}", cycle);

        // pick up external edits such as `miraictl reset`
        match self.state.load_or_default() {
            Ok(record) => self.record = record,
            Err(e) => warn!("Keeping in-memory state, reload failed: {}", e),
        }

        let health_check = self.health.run_all_checks().await;

        let mut errors_detected = self.scanner.scan_logs(&self.config.log_paths());
        errors_detected.append(&mut self.adhoc);

        let mut seen = HashSet::new();
        let mut fixes_applied = Vec::new();
        for detected in &errors_detected {
            if !seen.insert(detected.id.clone()) {
                debug!("{} already handled this cycle", detected.id);
                continue;
            }
            fixes_applied.push(self.auto_fix_error(detected));
        }

        self.persist(&errors_detected, &fixes_applied);

        info!(
            "Cycle {} complete: health {}, {} errors detected, {} fixes applied",
            cycle,
            health_check.overall_status.as_str(),
            errors_detected.len(),
            fixes_applied.iter().filter(|f| f.success).count()
        );

        CycleReport {
            cycle,
            timestamp: Utc::now(),
            health_check,
            errors_detected,
            fixes_applied,
        }
    }

    fn persist(&mut self, detected: &[DetectedError], fixes: &[FixResult]) {
        let summaries: HashMap<&str, String> = detected
            .iter()
            .rev()
            .map(|d| (d.id.as_str(), d.summary()))
            .collect();

        self.record.run_count += 1;
        let mut attempted = false;
        let mut any_failed = false;
        for fix in fixes.iter().filter(|f| f.outcome.attempted()) {
            attempted = true;
            any_failed |= !fix.success;
            let summary = summaries
                .get(fix.error_id.as_str())
                .cloned()
                .unwrap_or_else(|| fix.error_id.clone());
            self.record.record_attempt(
                &fix.error_id,
                &summary,
                fix.timestamp,
                fix.success,
                self.policy.cooldown_period,
            );
        }
        if attempted {
            self.record.retry_required = any_failed;
        }
        self.record.prune_cooldowns(Utc::now());

        if let Err(e) = self.history_log.append(fixes) {
            error!("Failed to append fix history: {}", e);
        }
        if let Err(e) = self.state.save(&self.record) {
            error!("Failed to save state: {}", e);
        }
    }

    /// Run cycles until stopped (Ctrl-C or `ShutdownHandle::stop`) or until
    /// `max_cycles` have completed. Returns the number of cycles run.
    pub async fn run<F>(&mut self, max_cycles: Option<u64>, mut on_report: F) -> u64
    where
        F: FnMut(&CycleReport),
    {
        self.shutdown.running.store(true, Ordering::SeqCst);

        let handle = self.shutdown.clone();
        let signal_task = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown requested, finishing current cycle");
                handle.stop();
            }
        });

        let interval = Duration::from_secs(self.config.cycle_interval_secs);
        let reached = |cycle: u64| max_cycles.map(|max| cycle >= max).unwrap_or(false);
        let mut cycle = 0;
        while self.shutdown.is_running() && !reached(cycle) {
            cycle += 1;
            let report = self.run_detection_cycle(cycle).await;
            on_report(&report);

            if reached(cycle) {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = self.shutdown.wake.notified() => {}
            }
        }

        signal_task.abort();
        self.shutdown.running.store(false, Ordering::SeqCst);
        info!("Auto-fix daemon stopped after {} cycles", cycle);
        cycle
    }
}
