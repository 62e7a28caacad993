//! Error pattern document: signatures, remediation actions, health check
//! settings and auto-fix policy.
//!
//! The document is JSON (or YAML for `.yaml`/`.yml` files):
//!
//! ```json
//! {
//!   "error_patterns": [
//!     { "id": "db_locked", "name": "Database locked", "pattern": "database is locked",
//!       "severity": "high", "auto_fix": true,
//!       "actions": [{ "type": "log_analysis" }, { "type": "alert", "message": "db lock" }] }
//!   ],
//!   "health_checks": { "http": { "url": "http://127.0.0.1:5100/api/health" } },
//!   "auto_fix_config": { "max_retries": 3, "cooldown_period": 300, "backup_before_fix": false }
//! }
//! ```

use crate::error::{AutofixError, Result};
use regex::RegexSet;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

/// Pattern severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    #[serde(alias = "warning")]
    Medium,
    #[serde(alias = "error")]
    High,
    Critical,
}

impl Default for Severity {
    fn default() -> Self {
        Self::Medium
    }
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// Level an `alert` action is reported at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
}

impl AlertLevel {
    fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "info" => Self::Info,
            "error" | "critical" => Self::Error,
            _ => Self::Warning,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Remediation action attached to a pattern.
///
/// Serialized with a `type` tag; unrecognized tags are kept as `Unknown` so
/// they fail at execution time instead of at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ActionRepr", into = "RawAction")]
pub enum Action {
    /// Diagnostic no-op
    LogAnalysis,
    /// Create directories relative to the project root; empty means the
    /// standard project directories
    CreateMissingDirs { dirs: Vec<String> },
    /// Record an alert in the daemon log
    Alert {
        message: Option<String>,
        level: AlertLevel,
    },
    Unknown { kind: String },
}

impl Action {
    pub fn kind(&self) -> &str {
        match self {
            Self::LogAnalysis => "log_analysis",
            Self::CreateMissingDirs { .. } => "create_missing_dirs",
            Self::Alert { .. } => "alert",
            Self::Unknown { kind } => kind,
        }
    }
}

/// Wire form of an action: `{"type": "...", ...params}`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawAction {
    #[serde(rename = "type")]
    kind: String,
    #[serde(flatten)]
    params: Map<String, Value>,
}

/// Actions may also be written as a bare type name
#[derive(Deserialize)]
#[serde(untagged)]
enum ActionRepr {
    Name(String),
    Tagged(RawAction),
}

impl From<ActionRepr> for Action {
    fn from(repr: ActionRepr) -> Self {
        let raw = match repr {
            ActionRepr::Name(kind) => RawAction {
                kind,
                params: Map::new(),
            },
            ActionRepr::Tagged(raw) => raw,
        };

        match raw.kind.as_str() {
            "log_analysis" => Action::LogAnalysis,
            "create_missing_dirs" => Action::CreateMissingDirs {
                dirs: raw
                    .params
                    .get("dirs")
                    .and_then(Value::as_array)
                    .map(|dirs| {
                        dirs.iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
            },
            "alert" => Action::Alert {
                message: raw
                    .params
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                level: raw
                    .params
                    .get("level")
                    .and_then(Value::as_str)
                    .map(AlertLevel::parse)
                    .unwrap_or(AlertLevel::Warning),
            },
            _ => Action::Unknown { kind: raw.kind },
        }
    }
}

impl From<Action> for RawAction {
    fn from(action: Action) -> Self {
        let mut params = Map::new();
        match &action {
            Action::CreateMissingDirs { dirs } if !dirs.is_empty() => {
                params.insert("dirs".to_string(), Value::from(dirs.clone()));
            }
            Action::Alert { message, level } => {
                if let Some(message) = message {
                    params.insert("message".to_string(), Value::from(message.clone()));
                }
                params.insert("level".to_string(), Value::from(level.as_str()));
            }
            _ => {}
        }
        RawAction {
            kind: action.kind().to_string(),
            params,
        }
    }
}

/// A recognized error signature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPattern {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(alias = "regex")]
    pub pattern: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub auto_fix: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_true() -> bool {
    true
}

/// How per-action results combine into the fix result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuccessPolicy {
    /// Every action must succeed
    All,
    /// Best effort: at least one action must succeed
    Any,
}

impl Default for SuccessPolicy {
    fn default() -> Self {
        Self::All
    }
}

impl SuccessPolicy {
    pub fn combine(&self, results: &[bool]) -> bool {
        match self {
            Self::All => results.iter().all(|ok| *ok),
            Self::Any => results.iter().any(|ok| *ok),
        }
    }
}

/// Auto-fix policy section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoFixConfig {
    /// Consecutive failed attempts before an error id is given up on
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Cooldown window in seconds
    #[serde(default = "default_cooldown_period")]
    pub cooldown_period: u64,
    #[serde(default)]
    pub backup_before_fix: bool,
    #[serde(default)]
    pub success_policy: SuccessPolicy,
}

/// Longest accepted cooldown window (30 days)
pub const MAX_COOLDOWN_SECS: u64 = 30 * 24 * 60 * 60;

fn default_max_retries() -> u32 {
    3
}

fn default_cooldown_period() -> u64 {
    300
}

impl Default for AutoFixConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            cooldown_period: default_cooldown_period(),
            backup_before_fix: false,
            success_policy: SuccessPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskCheckConfig {
    #[serde(default = "default_disk_path")]
    pub path: String,
    #[serde(default = "default_disk_warning")]
    pub warning_percent: f64,
    #[serde(default = "default_disk_critical")]
    pub critical_percent: f64,
}

fn default_disk_path() -> String {
    "/".to_string()
}

fn default_disk_warning() -> f64 {
    80.0
}

fn default_disk_critical() -> f64 {
    90.0
}

impl Default for DiskCheckConfig {
    fn default() -> Self {
        Self {
            path: default_disk_path(),
            warning_percent: default_disk_warning(),
            critical_percent: default_disk_critical(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryCheckConfig {
    #[serde(default = "default_memory_warning")]
    pub warning_percent: f64,
    #[serde(default = "default_memory_critical")]
    pub critical_percent: f64,
}

fn default_memory_warning() -> f64 {
    85.0
}

fn default_memory_critical() -> f64 {
    95.0
}

impl Default for MemoryCheckConfig {
    fn default() -> Self {
        Self {
            warning_percent: default_memory_warning(),
            critical_percent: default_memory_critical(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortCheckConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    #[serde(default = "default_probe_timeout")]
    pub timeout_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_probe_timeout() -> u64 {
    2
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpCheckConfig {
    pub url: String,
    #[serde(default = "default_probe_timeout")]
    pub timeout_secs: u64,
    /// Responses slower than this are reported as degraded
    #[serde(default = "default_slow_ms")]
    pub slow_ms: u64,
}

fn default_slow_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseCheckConfig {
    pub path: String,
}

/// Which health checks run, and their thresholds. Absent sections are skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthChecksConfig {
    #[serde(default = "default_disk")]
    pub disk: Option<DiskCheckConfig>,
    #[serde(default = "default_memory")]
    pub memory: Option<MemoryCheckConfig>,
    #[serde(default)]
    pub port: Option<PortCheckConfig>,
    #[serde(default)]
    pub http: Option<HttpCheckConfig>,
    #[serde(default)]
    pub directories: Vec<String>,
    #[serde(default)]
    pub database: Option<DatabaseCheckConfig>,
}

fn default_disk() -> Option<DiskCheckConfig> {
    Some(DiskCheckConfig::default())
}

fn default_memory() -> Option<MemoryCheckConfig> {
    Some(MemoryCheckConfig::default())
}

impl Default for HealthChecksConfig {
    fn default() -> Self {
        Self {
            disk: default_disk(),
            memory: default_memory(),
            port: None,
            http: None,
            directories: Vec::new(),
            database: None,
        }
    }
}

/// The whole pattern document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatternDocument {
    #[serde(default, alias = "patterns")]
    pub error_patterns: Vec<ErrorPattern>,
    #[serde(default)]
    pub health_checks: HealthChecksConfig,
    #[serde(default)]
    pub auto_fix_config: AutoFixConfig,
}

impl PatternDocument {
    /// Load and validate a pattern document
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AutofixError::Config(format!("cannot read pattern file {}: {}", path.display(), e))
        })?;

        let is_yaml = matches!(
            path.extension().and_then(|s| s.to_str()),
            Some("yaml") | Some("yml")
        );
        let doc = if is_yaml {
            Self::from_yaml(&content)?
        } else {
            Self::from_json(&content)?
        };
        doc.validate()?;

        info!(
            "Loaded {} error patterns from {}",
            doc.error_patterns.len(),
            path.display()
        );
        Ok(doc)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let mut doc: Self = serde_json::from_str(content)?;
        doc.normalize();
        Ok(doc)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let mut doc: Self = serde_yaml::from_str(content)?;
        doc.normalize();
        Ok(doc)
    }

    /// Fill optional fields that default to other fields
    fn normalize(&mut self) {
        for pattern in &mut self.error_patterns {
            if pattern.name.trim().is_empty() {
                pattern.name = pattern.id.clone();
            }
        }
    }

    /// Reject documents the daemon cannot run with
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for pattern in &self.error_patterns {
            if pattern.id.trim().is_empty() {
                return Err(AutofixError::Pattern {
                    id: pattern.name.clone(),
                    reason: "empty id".to_string(),
                });
            }
            if !seen.insert(pattern.id.as_str()) {
                return Err(AutofixError::Pattern {
                    id: pattern.id.clone(),
                    reason: "duplicate id".to_string(),
                });
            }
            if pattern.pattern.is_empty() {
                return Err(AutofixError::Pattern {
                    id: pattern.id.clone(),
                    reason: "empty pattern".to_string(),
                });
            }
            if let Err(e) = regex::Regex::new(&pattern.pattern) {
                return Err(AutofixError::Pattern {
                    id: pattern.id.clone(),
                    reason: e.to_string(),
                });
            }
        }

        if self.auto_fix_config.cooldown_period > MAX_COOLDOWN_SECS {
            return Err(AutofixError::Config(format!(
                "auto_fix_config.cooldown_period {} exceeds the maximum of {} seconds",
                self.auto_fix_config.cooldown_period, MAX_COOLDOWN_SECS
            )));
        }

        if let Some(disk) = &self.health_checks.disk {
            if disk.warning_percent > disk.critical_percent {
                return Err(AutofixError::Config(
                    "health_checks.disk: warning_percent exceeds critical_percent".to_string(),
                ));
            }
        }
        if let Some(memory) = &self.health_checks.memory {
            if memory.warning_percent > memory.critical_percent {
                return Err(AutofixError::Config(
                    "health_checks.memory: warning_percent exceeds critical_percent".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Non-fatal findings: unknown action types, auto-fix patterns without actions
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for pattern in &self.error_patterns {
            for action in &pattern.actions {
                if let Action::Unknown { kind } = action {
                    warnings.push(format!(
                        "pattern '{}': unknown action type '{}'",
                        pattern.id, kind
                    ));
                }
            }
            if pattern.auto_fix && pattern.actions.is_empty() {
                warnings.push(format!(
                    "pattern '{}': auto_fix enabled but no actions",
                    pattern.id
                ));
            }
        }
        warnings
    }
}

/// Enabled patterns compiled for line matching
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<ErrorPattern>,
    set: RegexSet,
}

impl PatternSet {
    pub fn compile(patterns: &[ErrorPattern]) -> Result<Self> {
        let enabled: Vec<ErrorPattern> = patterns.iter().filter(|p| p.enabled).cloned().collect();
        let set = RegexSet::new(enabled.iter().map(|p| p.pattern.as_str())).map_err(|e| {
            AutofixError::Pattern {
                id: "<set>".to_string(),
                reason: e.to_string(),
            }
        })?;
        debug!("Compiled {} enabled patterns", enabled.len());
        Ok(Self {
            patterns: enabled,
            set,
        })
    }

    /// First enabled pattern, in declaration order, that matches the line
    pub fn match_line(&self, line: &str) -> Option<&ErrorPattern> {
        self.set
            .matches(line)
            .into_iter()
            .next()
            .map(|idx| &self.patterns[idx])
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "error_patterns": [
            {"id": "disk_full", "name": "Disk full", "pattern": "No space left",
             "severity": "critical", "auto_fix": true,
             "actions": ["log_analysis", {"type": "alert", "message": "disk", "level": "error"}]},
            {"id": "missing_dir", "pattern": "FileNotFoundError: .*logs",
             "auto_fix": true,
             "actions": [{"type": "create_missing_dirs", "dirs": ["logs"]}, {"type": "reboot_host"}]},
            {"id": "off", "pattern": "No space", "enabled": false}
        ],
        "auto_fix_config": {"cooldown_period": 60}
    }"#;

    #[test]
    fn test_parse_document() {
        let doc = PatternDocument::from_json(DOC).unwrap();
        doc.validate().unwrap();

        assert_eq!(doc.error_patterns.len(), 3);
        assert_eq!(doc.error_patterns[0].severity, Severity::Critical);
        assert_eq!(doc.error_patterns[1].name, "missing_dir");
        assert_eq!(doc.auto_fix_config.cooldown_period, 60);
        assert_eq!(doc.auto_fix_config.max_retries, 3);
        assert_eq!(doc.auto_fix_config.success_policy, SuccessPolicy::All);
        assert!(doc.health_checks.disk.is_some());
        assert!(doc.health_checks.http.is_none());
    }

    #[test]
    fn test_action_variants() {
        let doc = PatternDocument::from_json(DOC).unwrap();
        let actions = &doc.error_patterns[0].actions;
        assert_eq!(actions[0], Action::LogAnalysis);
        assert_eq!(
            actions[1],
            Action::Alert {
                message: Some("disk".to_string()),
                level: AlertLevel::Error
            }
        );

        let actions = &doc.error_patterns[1].actions;
        assert_eq!(
            actions[0],
            Action::CreateMissingDirs {
                dirs: vec!["logs".to_string()]
            }
        );
        assert_eq!(actions[1].kind(), "reboot_host");
    }

    #[test]
    fn test_unknown_action_serializes_with_its_tag() {
        let action: Action = serde_json::from_str(r#"{"type": "unknown_x"}"#).unwrap();
        assert_eq!(
            action,
            Action::Unknown {
                kind: "unknown_x".to_string()
            }
        );
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "unknown_x");
    }

    #[test]
    fn test_patterns_alias_and_yaml() {
        let yaml = r#"
patterns:
  - id: timeout
    regex: "timed out"
    severity: warning
    auto_fix: false
"#;
        let doc = PatternDocument::from_yaml(yaml).unwrap();
        doc.validate().unwrap();
        assert_eq!(doc.error_patterns[0].pattern, "timed out");
        assert_eq!(doc.error_patterns[0].severity, Severity::Medium);
    }

    #[test]
    fn test_missing_required_field_is_error() {
        let result = PatternDocument::from_json(r#"{"error_patterns": [{"name": "x"}]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_duplicates_and_bad_regex() {
        let dup = r#"{"error_patterns": [{"id": "a", "pattern": "x"}, {"id": "a", "pattern": "y"}]}"#;
        let err = PatternDocument::from_json(dup).unwrap().validate().unwrap_err();
        assert!(err.to_string().contains("duplicate"));

        let bad = r#"{"error_patterns": [{"id": "a", "pattern": "(unclosed"}]}"#;
        assert!(PatternDocument::from_json(bad).unwrap().validate().is_err());
    }

    #[test]
    fn test_warnings() {
        let doc = PatternDocument::from_json(DOC).unwrap();
        let warnings = doc.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("reboot_host"));
    }

    #[test]
    fn test_pattern_set_first_match_wins() {
        let doc = PatternDocument::from_json(DOC).unwrap();
        let set = PatternSet::compile(&doc.error_patterns).unwrap();

        // disabled pattern is excluded
        assert_eq!(set.len(), 2);
        assert_eq!(
            set.match_line("write failed: No space left on device").map(|p| p.id.as_str()),
            Some("disk_full")
        );
        assert!(set.match_line("all good").is_none());
    }

    #[test]
    fn test_success_policy() {
        assert!(SuccessPolicy::All.combine(&[true, true]));
        assert!(!SuccessPolicy::All.combine(&[true, false]));
        assert!(SuccessPolicy::Any.combine(&[false, true]));
        assert!(!SuccessPolicy::Any.combine(&[false, false]));
    }

    #[test]
    fn test_shipped_document_is_valid() {
        let doc =
            PatternDocument::from_json(include_str!("../../../assets/error_patterns.json")).unwrap();
        doc.validate().unwrap();
        assert!(doc.warnings().is_empty());
        assert_eq!(doc.auto_fix_config.success_policy, SuccessPolicy::All);
        assert!(doc.health_checks.http.is_some());
    }

    #[test]
    fn test_cooldown_period_bounded() {
        let doc = PatternDocument::from_json(
            r#"{"error_patterns": [], "auto_fix_config": {"cooldown_period": 10000000000000}}"#,
        )
        .unwrap();
        let err = doc.validate().unwrap_err();
        assert!(matches!(err, AutofixError::Config(_)));
        assert!(err.to_string().contains("cooldown_period"));

        let doc = PatternDocument::from_json(
            r#"{"error_patterns": [], "auto_fix_config": {"cooldown_period": 2592000}}"#,
        )
        .unwrap();
        doc.validate().unwrap();
    }
}
