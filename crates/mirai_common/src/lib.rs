//! Mirai Common - shared types for the auto-fix daemon and its CLI
//!
//! Error pattern document, health/fix data model, the persisted state record
//! and the fix history log.

pub mod error;
pub mod history;
pub mod paths;
pub mod patterns;
pub mod state;
pub mod types;

pub use error::{AutofixError, Result};
pub use history::{ErrorStats, HistoryLog, HistoryStats};
pub use patterns::{
    Action, AlertLevel, AutoFixConfig, ErrorPattern, HealthChecksConfig, PatternDocument,
    PatternSet, Severity, SuccessPolicy, MAX_COOLDOWN_SECS,
};
pub use state::{cooldown_end, StateRecord, StateStore};
pub use types::*;
