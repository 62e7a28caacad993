//! Action implementations
//!
//! Each action is idempotent and reports its outcome as an `ActionResult`.

use mirai_common::{ActionResult, AlertLevel, DetectedError};
use std::fs;
use std::path::{Component, Path};
use tracing::{error, info, warn};

/// Directories created when `create_missing_dirs` lists none
pub const DEFAULT_PROJECT_DIRS: &[&str] = &["logs", "data", "backups"];

/// Diagnostic pass over the detection; always succeeds
pub fn log_analysis(detected: Option<&DetectedError>) -> ActionResult {
    let message = match detected {
        Some(e) => {
            info!(
                "Log analysis: [{}] {} at {}:{}: {}",
                e.severity.as_str(),
                e.id,
                e.source_file,
                e.line_number,
                e.matched_line
            );
            format!("Analyzed {} in {}", e.id, e.source_file)
        }
        None => "Log analysis completed".to_string(),
    };

    ActionResult {
        action_type: "log_analysis".to_string(),
        success: true,
        message,
    }
}

/// Create each directory under `project_root`; existing ones are left alone.
///
/// Paths must be relative and stay inside the root.
pub fn create_missing_dirs(dirs: &[String], project_root: &Path) -> ActionResult {
    let requested: Vec<&str> = if dirs.is_empty() {
        DEFAULT_PROJECT_DIRS.to_vec()
    } else {
        dirs.iter().map(String::as_str).collect()
    };

    let mut created = Vec::new();
    let mut failures = Vec::new();

    for dir in requested {
        let rel = Path::new(dir);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || dir.is_empty() {
            failures.push(format!("{} (outside project root)", dir));
            continue;
        }

        let path = project_root.join(rel);
        if path.is_dir() {
            continue;
        }
        match fs::create_dir_all(&path) {
            Ok(()) => {
                info!("Created directory {}", path.display());
                created.push(dir.to_string());
            }
            Err(e) => failures.push(format!("{} ({})", dir, e)),
        }
    }

    let message = if !failures.is_empty() {
        format!("Failed to create: {}", failures.join(", "))
    } else if created.is_empty() {
        "All directories already present".to_string()
    } else {
        format!("Created: {}", created.join(", "))
    };

    ActionResult {
        action_type: "create_missing_dirs".to_string(),
        success: failures.is_empty(),
        message,
    }
}

/// Record an alert in the daemon log; always succeeds
pub fn alert(
    message: Option<&str>,
    level: AlertLevel,
    detected: Option<&DetectedError>,
) -> ActionResult {
    let text = match (message, detected) {
        (Some(m), _) => m.to_string(),
        (None, Some(e)) => format!("{} detected in {}", e.name, e.source_file),
        (None, None) => "Alert raised".to_string(),
    };

    match level {
        AlertLevel::Info => info!("ALERT: {}", text),
        AlertLevel::Warning => warn!("ALERT: {}", text),
        AlertLevel::Error => error!("ALERT: {}", text),
    }

    ActionResult {
        action_type: "alert".to_string(),
        success: true,
        message: format!("Alert recorded ({}): {}", level.as_str(), text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_missing_dirs_idempotent() {
        let dir = TempDir::new().unwrap();
        let dirs = vec!["logs".to_string(), "data/cache".to_string()];

        let first = create_missing_dirs(&dirs, dir.path());
        assert!(first.success);
        assert!(first.message.contains("data/cache"));
        assert!(dir.path().join("data/cache").is_dir());

        let second = create_missing_dirs(&dirs, dir.path());
        assert!(second.success);
        assert_eq!(second.message, "All directories already present");
    }

    #[test]
    fn test_create_missing_dirs_defaults() {
        let dir = TempDir::new().unwrap();
        assert!(create_missing_dirs(&[], dir.path()).success);
        for d in DEFAULT_PROJECT_DIRS {
            assert!(dir.path().join(d).is_dir());
        }
    }

    #[test]
    fn test_create_missing_dirs_rejects_escape() {
        let dir = TempDir::new().unwrap();
        let result = create_missing_dirs(
            &["../outside".to_string(), "/etc/mirai".to_string()],
            dir.path(),
        );
        assert!(!result.success);
        assert!(!dir.path().parent().unwrap().join("outside").exists());
    }

    #[test]
    fn test_alert_always_succeeds() {
        let result = alert(Some("disk almost full"), AlertLevel::Error, None);
        assert!(result.success);
        assert!(result.message.contains("disk almost full"));
    }
}
