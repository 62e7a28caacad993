//! Shared data model for health checks, detections and fix results.

use crate::patterns::{Action, ErrorPattern, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Status of a single health check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Aggregated status of a full check battery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Healthy,
    Degraded,
    Critical,
}

impl OverallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Critical => "critical",
        }
    }
}

/// Result from running one health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub name: String,
    pub status: HealthStatus,
    /// An unhealthy critical check forces the overall status to critical
    pub critical: bool,
    pub message: String,
    #[serde(default)]
    pub details: BTreeMap<String, serde_json::Value>,
}

impl HealthCheckResult {
    pub fn new(name: &str, status: HealthStatus, critical: bool, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            critical,
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    pub fn healthy(name: &str, critical: bool, message: impl Into<String>) -> Self {
        Self::new(name, HealthStatus::Healthy, critical, message)
    }

    pub fn degraded(name: &str, critical: bool, message: impl Into<String>) -> Self {
        Self::new(name, HealthStatus::Degraded, critical, message)
    }

    pub fn unhealthy(name: &str, critical: bool, message: impl Into<String>) -> Self {
        Self::new(name, HealthStatus::Unhealthy, critical, message)
    }

    /// Attach a detail entry
    pub fn with_detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    pub fn is_unhealthy(&self) -> bool {
        self.status == HealthStatus::Unhealthy
    }
}

/// System resource snapshot, taken once per cycle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemMetrics {
    pub disk_total_gb: f64,
    pub disk_free_gb: f64,
    pub disk_used_percent: f64,
    pub cpu_count: usize,
    pub memory_total_mb: u64,
    pub memory_used_percent: f64,
    pub load_average_1m: f64,
}

/// Output of a full health check battery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub timestamp: DateTime<Utc>,
    pub overall_status: OverallStatus,
    pub checks: Vec<HealthCheckResult>,
    pub metrics: SystemMetrics,
}

impl HealthReport {
    /// Aggregate check results into an overall status.
    ///
    /// Critical if any critical check is unhealthy; degraded if any other
    /// check is unhealthy or any check reports degraded; healthy otherwise.
    pub fn aggregate(checks: &[HealthCheckResult]) -> OverallStatus {
        if checks.iter().any(|c| c.critical && c.is_unhealthy()) {
            OverallStatus::Critical
        } else if checks
            .iter()
            .any(|c| c.is_unhealthy() || c.status == HealthStatus::Degraded)
        {
            OverallStatus::Degraded
        } else {
            OverallStatus::Healthy
        }
    }

    pub fn new(checks: Vec<HealthCheckResult>, metrics: SystemMetrics) -> Self {
        Self {
            timestamp: Utc::now(),
            overall_status: Self::aggregate(&checks),
            checks,
            metrics,
        }
    }
}

/// A log line that matched an error pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedError {
    pub id: String,
    pub name: String,
    pub pattern: String,
    pub severity: Severity,
    pub auto_fix: bool,
    pub actions: Vec<Action>,
    pub source_file: String,
    pub line_number: usize,
    pub matched_line: String,
    pub timestamp: DateTime<Utc>,
}

impl DetectedError {
    pub fn from_match(pattern: &ErrorPattern, source: &str, line_number: usize, line: &str) -> Self {
        Self {
            id: pattern.id.clone(),
            name: pattern.name.clone(),
            pattern: pattern.pattern.clone(),
            severity: pattern.severity,
            auto_fix: pattern.auto_fix,
            actions: pattern.actions.clone(),
            source_file: source.to_string(),
            line_number,
            matched_line: line.trim_end().to_string(),
            timestamp: Utc::now(),
        }
    }

    /// One-line summary for the state record
    pub fn summary(&self) -> String {
        format!("{} ({}:{})", self.name, self.source_file, self.line_number)
    }
}

/// Outcome of one remediation action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    #[serde(rename = "type")]
    pub action_type: String,
    pub success: bool,
    pub message: String,
}

/// Why a fix attempt ended the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixOutcome {
    Fixed,
    Failed,
    Disabled,
    Cooldown,
    RetriesExhausted,
}

impl FixOutcome {
    /// Whether actions were actually executed
    pub fn attempted(&self) -> bool {
        matches!(self, Self::Fixed | Self::Failed)
    }
}

/// Result of one remediation attempt for a detected error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixResult {
    pub attempt_id: String,
    pub error_id: String,
    pub success: bool,
    pub outcome: FixOutcome,
    pub actions_executed: Vec<ActionResult>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl FixResult {
    pub fn new(error_id: &str, outcome: FixOutcome, message: impl Into<String>) -> Self {
        Self {
            attempt_id: uuid::Uuid::new_v4().to_string(),
            error_id: error_id.to_string(),
            success: outcome == FixOutcome::Fixed,
            outcome,
            actions_executed: Vec::new(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_actions(mut self, actions: Vec<ActionResult>) -> Self {
        self.actions_executed = actions;
        self
    }
}

/// Report returned from one detection cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub timestamp: DateTime<Utc>,
    pub health_check: HealthReport,
    pub errors_detected: Vec<DetectedError>,
    pub fixes_applied: Vec<FixResult>,
}
