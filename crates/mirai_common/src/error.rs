//! Error types for the auto-fix core.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutofixError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid pattern '{id}': {reason}")]
    Pattern { id: String, reason: String },

    #[error("State file error ({}): {reason}", path.display())]
    State { path: PathBuf, reason: String },

    #[error("State file already exists at {} (use --force to overwrite)", .0.display())]
    StateExists(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, AutofixError>;
