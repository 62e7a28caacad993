//! Configuration management for miraid.
//!
//! Loads settings from a TOML file (`--config`, `$MIRAI_AUTOFIX_CONFIG`, or
//! /etc/mirai/miraid.toml) or uses defaults. Relative paths resolve against
//! `project_root`.

use anyhow::{Context, Result};
use mirai_common::paths;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Root of the monitored application; remediation never writes outside it
    #[serde(default = "default_project_root")]
    pub project_root: PathBuf,

    /// Error pattern document (JSON or YAML)
    #[serde(default = "default_patterns_file")]
    pub patterns_file: PathBuf,

    #[serde(default = "paths::state_file")]
    pub state_file: PathBuf,

    #[serde(default = "paths::history_file")]
    pub history_file: PathBuf,

    /// Log files scanned every cycle
    #[serde(default = "default_log_files")]
    pub log_files: Vec<PathBuf>,

    /// Pause between cycles in seconds
    #[serde(default = "default_cycle_interval")]
    pub cycle_interval_secs: u64,
}

fn default_project_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_patterns_file() -> PathBuf {
    PathBuf::from("config/error_patterns.json")
}

fn default_log_files() -> Vec<PathBuf> {
    vec![PathBuf::from("logs/app.log"), PathBuf::from("logs/error.log")]
}

fn default_cycle_interval() -> u64 {
    60
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            project_root: default_project_root(),
            patterns_file: default_patterns_file(),
            state_file: paths::state_file(),
            history_file: paths::history_file(),
            log_files: default_log_files(),
            cycle_interval_secs: default_cycle_interval(),
        }
    }
}

impl DaemonConfig {
    /// Resolve a possibly relative path against the project root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    pub fn patterns_path(&self) -> PathBuf {
        self.resolve(&self.patterns_file)
    }

    pub fn state_path(&self) -> PathBuf {
        self.resolve(&self.state_file)
    }

    pub fn history_path(&self) -> PathBuf {
        self.resolve(&self.history_file)
    }

    pub fn log_paths(&self) -> Vec<PathBuf> {
        self.log_files.iter().map(|p| self.resolve(p)).collect()
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse daemon config")
    }
}

/// Load configuration.
///
/// An explicitly requested file must exist; the default location may be
/// absent, in which case defaults are used.
pub fn load_config(explicit: Option<&Path>) -> Result<DaemonConfig> {
    let (path, required) = match explicit {
        Some(p) => (p.to_path_buf(), true),
        None => (paths::config_path(), false),
    };

    if !path.exists() {
        if required {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        warn!("No config at {}, using defaults", path.display());
        return Ok(DaemonConfig::default());
    }

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config = DaemonConfig::from_toml(&content)
        .with_context(|| format!("Invalid config {}", path.display()))?;

    info!("Loaded config from {}", path.display());
    Ok(config)
}
