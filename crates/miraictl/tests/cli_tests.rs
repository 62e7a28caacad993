//! CLI integration tests for miraictl
//!
//! Tests the CLI surface against a scratch state file:
//! - init / show / reset round trip
//! - guard flags (--force, --confirm) and their exit codes
//! - stats formats and validate failures

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn miraictl(state: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_miraictl"))
        .arg("--state")
        .arg(state)
        .arg("--history")
        .arg(state.with_file_name("fix_history.jsonl"))
        .args(args)
        .output()
        .expect("Failed to run miraictl")
}

fn show_json(state: &Path) -> serde_json::Value {
    let output = miraictl(state, &["show", "--json"]);
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_init_show_reset_round_trip() {
    let dir = TempDir::new().unwrap();
    let state = dir.path().join("autofix_state.json");

    assert!(miraictl(&state, &["init", "--force"]).status.success());
    let shown = show_json(&state);
    assert_eq!(shown["run_count"], 0);
    assert_eq!(shown["retry_required"], false);

    // simulate the daemon having run and failed
    let mut mutated = shown.clone();
    mutated["run_count"] = serde_json::json!(7);
    mutated["retry_required"] = serde_json::json!(true);
    mutated["last_error_id"] = serde_json::json!("db_locked");
    fs::write(&state, serde_json::to_string(&mutated).unwrap()).unwrap();
    assert_eq!(show_json(&state)["run_count"], 7);

    assert!(miraictl(&state, &["reset", "--confirm"]).status.success());
    let restored = show_json(&state);
    assert_eq!(restored["run_count"], 0);
    assert_eq!(restored["retry_required"], false);
    assert!(restored["last_error_id"].is_null());
}

#[test]
fn test_guard_flags_refuse() {
    let dir = TempDir::new().unwrap();
    let state = dir.path().join("autofix_state.json");

    assert!(miraictl(&state, &["init"]).status.success());
    assert_eq!(miraictl(&state, &["init"]).status.code(), Some(3));
    assert_eq!(miraictl(&state, &["reset"]).status.code(), Some(3));
}

#[test]
fn test_show_without_state_fails() {
    let dir = TempDir::new().unwrap();
    let output = miraictl(&dir.path().join("absent.json"), &["show"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_validate_exit_codes() {
    let dir = TempDir::new().unwrap();
    let state = dir.path().join("autofix_state.json");
    miraictl(&state, &["init"]);
    assert!(miraictl(&state, &["validate"]).status.success());

    fs::write(&state, "{not json").unwrap();
    assert_eq!(miraictl(&state, &["validate"]).status.code(), Some(2));
}

#[test]
fn test_stats_formats() {
    let dir = TempDir::new().unwrap();
    let state = dir.path().join("autofix_state.json");
    miraictl(&state, &["init"]);

    let json = miraictl(&state, &["stats", "--format", "json"]);
    assert!(json.status.success());
    let report: serde_json::Value = serde_json::from_slice(&json.stdout).unwrap();
    assert_eq!(report["state"]["run_count"], 0);
    assert_eq!(report["history"]["total_entries"], 0);

    let csv = miraictl(&state, &["stats", "--format", "csv"]);
    assert!(csv.status.success());
    let text = String::from_utf8(csv.stdout).unwrap();
    assert!(text.starts_with("metric,value\n"));
    assert!(text.contains("run_count,0"));

    assert!(miraictl(&state, &["stats"]).status.success());
}
