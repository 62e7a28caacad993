//! Health subsystem
//!
//! Runs the configured check battery once per cycle and aggregates it into
//! an overall status. Disk and HTTP checks are critical; memory, port,
//! directory and database checks can only degrade the overall status.

pub mod checks;

use anyhow::{Context, Result};
use mirai_common::{HealthChecksConfig, HealthCheckResult, HealthReport, SystemMetrics};
use std::path::PathBuf;
use std::time::Duration;
use sysinfo::System;
use tracing::{debug, info, warn};

/// Point-in-time health checker
pub struct HealthMonitor {
    config: HealthChecksConfig,
    project_root: PathBuf,
    client: reqwest::Client,
}

impl HealthMonitor {
    pub fn new(config: HealthChecksConfig, project_root: impl Into<PathBuf>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(
                config.http.as_ref().map(|h| h.timeout_secs).unwrap_or(2),
            ))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            config,
            project_root: project_root.into(),
            client,
        })
    }

    pub fn check_disk_space(&self) -> Option<HealthCheckResult> {
        self.config
            .disk
            .as_ref()
            .map(|c| checks::check_disk_space(c, &self.project_root))
    }

    pub fn check_memory(&self) -> Option<HealthCheckResult> {
        self.config.memory.as_ref().map(checks::check_memory)
    }

    pub async fn check_port(&self) -> Option<HealthCheckResult> {
        match &self.config.port {
            Some(c) => Some(checks::check_port(c).await),
            None => None,
        }
    }

    pub async fn check_http_endpoint(&self) -> Option<HealthCheckResult> {
        match &self.config.http {
            Some(c) => Some(checks::check_http_endpoint(&self.client, c).await),
            None => None,
        }
    }

    pub fn check_directories(&self) -> Option<HealthCheckResult> {
        if self.config.directories.is_empty() {
            return None;
        }
        Some(checks::check_directories(
            &self.config.directories,
            &self.project_root,
        ))
    }

    pub async fn check_database(&self) -> Option<HealthCheckResult> {
        match &self.config.database {
            Some(c) => Some(checks::check_database(c, &self.project_root).await),
            None => None,
        }
    }

    /// Resource snapshot for the cycle report
    pub fn collect_metrics(&self) -> SystemMetrics {
        let mut sys = System::new();
        sys.refresh_memory();

        let disk_path = self
            .config
            .disk
            .as_ref()
            .map(|d| self.project_root.join(&d.path))
            .unwrap_or_else(|| PathBuf::from("/"));
        let (disk_total, disk_free) = checks::disk_usage_for(&disk_path).unwrap_or((0, 0));
        let gb = 1024.0 * 1024.0 * 1024.0;

        let total_memory = sys.total_memory();
        SystemMetrics {
            disk_total_gb: disk_total as f64 / gb,
            disk_free_gb: disk_free as f64 / gb,
            disk_used_percent: if disk_total > 0 {
                (disk_total - disk_free) as f64 / disk_total as f64 * 100.0
            } else {
                0.0
            },
            cpu_count: num_cpus::get(),
            memory_total_mb: total_memory / (1024 * 1024),
            memory_used_percent: if total_memory > 0 {
                sys.used_memory() as f64 / total_memory as f64 * 100.0
            } else {
                0.0
            },
            load_average_1m: System::load_average().one,
        }
    }

    /// Run the full battery. Never fails; probe errors become unhealthy results.
    pub async fn run_all_checks(&self) -> HealthReport {
        let mut results = Vec::new();

        results.extend(self.check_disk_space());
        results.extend(self.check_memory());
        results.extend(self.check_port().await);
        results.extend(self.check_http_endpoint().await);
        results.extend(self.check_directories());
        results.extend(self.check_database().await);

        for result in results.iter().filter(|r| r.is_unhealthy()) {
            warn!("Health check {} unhealthy: {}", result.name, result.message);
        }

        let report = HealthReport::new(results, self.collect_metrics());
        debug!("{} health checks run", report.checks.len());
        info!("Health status: {}", report.overall_status.as_str());
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirai_common::{HealthStatus, OverallStatus};
    use tempfile::TempDir;

    fn config_without_os_checks() -> HealthChecksConfig {
        HealthChecksConfig {
            disk: None,
            memory: None,
            ..HealthChecksConfig::default()
        }
    }

    #[tokio::test]
    async fn test_empty_battery_is_healthy() {
        let dir = TempDir::new().unwrap();
        let monitor = HealthMonitor::new(config_without_os_checks(), dir.path()).unwrap();

        let report = monitor.run_all_checks().await;
        assert!(report.checks.is_empty());
        assert_eq!(report.overall_status, OverallStatus::Healthy);
    }

    #[tokio::test]
    async fn test_missing_directory_degrades() {
        let dir = TempDir::new().unwrap();
        let mut config = config_without_os_checks();
        config.directories = vec!["uploads".to_string()];
        let monitor = HealthMonitor::new(config, dir.path()).unwrap();

        let report = monitor.run_all_checks().await;
        assert_eq!(report.checks.len(), 1);
        assert_eq!(report.checks[0].status, HealthStatus::Unhealthy);
        assert_eq!(report.overall_status, OverallStatus::Degraded);
    }

    #[tokio::test]
    async fn test_unreachable_http_is_critical() {
        let dir = TempDir::new().unwrap();
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut config = config_without_os_checks();
        config.http = Some(mirai_common::patterns::HttpCheckConfig {
            url: format!("http://127.0.0.1:{}/", port),
            timeout_secs: 1,
            slow_ms: 1000,
        });
        let monitor = HealthMonitor::new(config, dir.path()).unwrap();

        let report = monitor.run_all_checks().await;
        assert_eq!(report.overall_status, OverallStatus::Critical);
    }

    #[test]
    fn test_default_battery_runs_os_checks() {
        let dir = TempDir::new().unwrap();
        let monitor = HealthMonitor::new(HealthChecksConfig::default(), dir.path()).unwrap();

        let disk = monitor.check_disk_space().unwrap();
        assert!(disk.critical);
        let memory = monitor.check_memory().unwrap();
        assert!(!memory.critical);
        assert!(monitor.collect_metrics().cpu_count >= 1);
    }
}
