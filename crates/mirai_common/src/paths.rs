//! Default file locations for the daemon and CLI.
//!
//! Each can be redirected through an environment variable so the tools run
//! unprivileged during development.

use std::path::PathBuf;

/// Daemon config file
pub const DEFAULT_CONFIG_PATH: &str = "/etc/mirai/miraid.toml";

/// Directory holding the state file and fix history
pub const DEFAULT_STATE_DIR: &str = "/var/lib/mirai";

pub const STATE_FILE: &str = "autofix_state.json";
pub const HISTORY_FILE: &str = "fix_history.jsonl";

/// Config path: $MIRAI_AUTOFIX_CONFIG or the system default
pub fn config_path() -> PathBuf {
    std::env::var("MIRAI_AUTOFIX_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// State directory: $MIRAI_STATE_DIR or the system default
pub fn state_dir() -> PathBuf {
    std::env::var("MIRAI_STATE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_STATE_DIR))
}

pub fn state_file() -> PathBuf {
    state_dir().join(STATE_FILE)
}

pub fn history_file() -> PathBuf {
    state_dir().join(HISTORY_FILE)
}
