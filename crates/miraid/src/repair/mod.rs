//! Repair subsystem: remediation actions for detected errors
//!
//! A single dispatch over the closed `Action` set. Unknown action types fail
//! explicitly rather than being ignored.

mod actions;

pub use actions::{alert, create_missing_dirs, log_analysis, DEFAULT_PROJECT_DIRS};

use mirai_common::{Action, ActionResult, DetectedError};
use std::path::Path;
use tracing::{info, warn};

/// Execute one action.
///
/// `project_root` bounds directory creation; `error` is the detection being
/// remediated, when there is one.
pub fn execute_action(
    action: &Action,
    project_root: &Path,
    error: Option<&DetectedError>,
) -> ActionResult {
    info!("Executing action: {}", action.kind());

    let result = match action {
        Action::LogAnalysis => log_analysis(error),
        Action::CreateMissingDirs { dirs } => create_missing_dirs(dirs, project_root),
        Action::Alert { message, level } => alert(message.as_deref(), *level, error),
        Action::Unknown { kind } => ActionResult {
            action_type: kind.clone(),
            success: false,
            message: format!("unknown action type: {}", kind),
        },
    };

    if !result.success {
        warn!("Action {} failed: {}", result.action_type, result.message);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_unknown_action_fails() {
        let dir = TempDir::new().unwrap();
        let action: Action = serde_json::from_str(r#"{"type": "unknown_x"}"#).unwrap();

        let result = execute_action(&action, dir.path(), None);
        assert!(!result.success);
        assert_eq!(result.action_type, "unknown_x");
        assert_eq!(result.message, "unknown action type: unknown_x");
    }

    #[test]
    fn test_dispatch_known_actions() {
        let dir = TempDir::new().unwrap();

        assert!(execute_action(&Action::LogAnalysis, dir.path(), None).success);

        let create = Action::CreateMissingDirs {
            dirs: vec!["logs".to_string()],
        };
        let result = execute_action(&create, dir.path(), None);
        assert!(result.success);
        assert_eq!(result.action_type, "create_missing_dirs");
        assert!(dir.path().join("logs").is_dir());
    }
}
