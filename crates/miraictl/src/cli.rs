//! CLI - Command-line argument parsing
//!
//! Keeps argument parsing separate from command execution.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Mirai auto-fix state tool
#[derive(Parser)]
#[command(name = "miraictl")]
#[command(about = "Inspect and manage the Mirai auto-fix state file", long_about = None)]
#[command(version = env!("MIRAI_VERSION"))]
pub struct Cli {
    /// State file (overrides $MIRAI_STATE_DIR and defaults)
    #[arg(long, global = true)]
    pub state: Option<PathBuf>,

    /// Fix history log used by `stats`
    #[arg(long, global = true)]
    pub history: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the state file with its initial record
    Init {
        /// Overwrite an existing state file
        #[arg(long)]
        force: bool,
    },

    /// Print the current state
    Show {
        /// Output JSON only
        #[arg(long)]
        json: bool,
    },

    /// Restore the initial record
    Reset {
        /// Required; reset discards run count and cooldown
        #[arg(long)]
        confirm: bool,
    },

    /// Summarize state and fix history
    Stats {
        #[arg(long, value_enum, default_value_t = StatsFormat::Text)]
        format: StatsFormat,
    },

    /// Check the state file (and optionally a pattern document)
    Validate {
        /// Error pattern document to validate as well
        #[arg(long)]
        patterns: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatsFormat {
    Text,
    Json,
    Csv,
}
