//! Mirai auto-fix daemon
//!
//! Periodically checks system health, scans application logs for known error
//! patterns and applies the remediation actions configured for each pattern.

pub mod config;
pub mod cooldown;
pub mod daemon;
pub mod health;
pub mod repair;
pub mod scanner;

pub use config::{load_config, DaemonConfig};
pub use daemon::{AutoFixDaemon, ShutdownHandle};
pub use health::HealthMonitor;
pub use scanner::LogScanner;
