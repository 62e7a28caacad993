//! Individual health checks
//!
//! Every check returns a `HealthCheckResult`; failures to probe are reported
//! as `unhealthy` results, never as errors.

use mirai_common::patterns::{
    DatabaseCheckConfig, DiskCheckConfig, HttpCheckConfig, MemoryCheckConfig, PortCheckConfig,
};
use mirai_common::HealthCheckResult;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use sysinfo::{Disks, System};
use tokio::net::TcpStream;
use tracing::debug;

pub const DISK_CHECK: &str = "disk_space";
pub const MEMORY_CHECK: &str = "memory";
pub const PORT_CHECK: &str = "process_port";
pub const HTTP_CHECK: &str = "http_endpoint";
pub const DIRECTORIES_CHECK: &str = "directories";
pub const DATABASE_CHECK: &str = "database";

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Classify a usage percentage against warning/critical thresholds
pub fn evaluate_usage(
    name: &str,
    critical: bool,
    used_percent: f64,
    warning_percent: f64,
    critical_percent: f64,
) -> HealthCheckResult {
    let result = if used_percent >= critical_percent {
        HealthCheckResult::unhealthy(
            name,
            critical,
            format!("{:.1}% used (critical threshold {:.0}%)", used_percent, critical_percent),
        )
    } else if used_percent >= warning_percent {
        HealthCheckResult::degraded(
            name,
            critical,
            format!("{:.1}% used (warning threshold {:.0}%)", used_percent, warning_percent),
        )
    } else {
        HealthCheckResult::healthy(name, critical, format!("{:.1}% used", used_percent))
    };
    result.with_detail("used_percent", round1(used_percent))
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Total and available bytes of the filesystem holding `path`.
///
/// Picks the disk with the longest mount point that prefixes the path.
pub fn disk_usage_for(path: &Path) -> Option<(u64, u64)> {
    let disks = Disks::new_with_refreshed_list();
    let target = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

    disks
        .list()
        .iter()
        .filter(|d| target.starts_with(d.mount_point()))
        .max_by_key(|d| d.mount_point().as_os_str().len())
        .map(|d| (d.total_space(), d.available_space()))
}

pub fn check_disk_space(config: &DiskCheckConfig, project_root: &Path) -> HealthCheckResult {
    let path = resolve(project_root, &config.path);

    match disk_usage_for(&path) {
        Some((total, available)) if total > 0 => {
            let used_percent = (total - available) as f64 / total as f64 * 100.0;
            evaluate_usage(
                DISK_CHECK,
                true,
                used_percent,
                config.warning_percent,
                config.critical_percent,
            )
            .with_detail("path", path.display().to_string())
            .with_detail("total_gb", round1(total as f64 / BYTES_PER_GB))
            .with_detail("free_gb", round1(available as f64 / BYTES_PER_GB))
        }
        _ => HealthCheckResult::unhealthy(
            DISK_CHECK,
            true,
            format!("No filesystem found for {}", path.display()),
        ),
    }
}

pub fn check_memory(config: &MemoryCheckConfig) -> HealthCheckResult {
    let mut sys = System::new();
    sys.refresh_memory();

    let total = sys.total_memory();
    if total == 0 {
        return HealthCheckResult::unhealthy(MEMORY_CHECK, false, "Memory size unavailable");
    }
    let used_percent = sys.used_memory() as f64 / total as f64 * 100.0;

    evaluate_usage(
        MEMORY_CHECK,
        false,
        used_percent,
        config.warning_percent,
        config.critical_percent,
    )
    .with_detail("total_mb", total / (1024 * 1024))
}

pub async fn check_port(config: &PortCheckConfig) -> HealthCheckResult {
    let addr = format!("{}:{}", config.host, config.port);
    let timeout = Duration::from_secs(config.timeout_secs);

    let result = match tokio::time::timeout(timeout, TcpStream::connect(&addr)).await {
        Ok(Ok(_)) => HealthCheckResult::healthy(PORT_CHECK, false, format!("{} is accepting connections", addr)),
        Ok(Err(e)) => HealthCheckResult::unhealthy(
            PORT_CHECK,
            false,
            format!("{} refused connection: {}", addr, e),
        ),
        Err(_) => HealthCheckResult::unhealthy(
            PORT_CHECK,
            false,
            format!("{} timed out after {}s", addr, config.timeout_secs),
        ),
    };
    result.with_detail("port", config.port)
}

pub async fn check_http_endpoint(
    client: &reqwest::Client,
    config: &HttpCheckConfig,
) -> HealthCheckResult {
    let start = Instant::now();
    let response = client
        .get(&config.url)
        .timeout(Duration::from_secs(config.timeout_secs))
        .send()
        .await;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    let result = match response {
        Ok(resp) if resp.status().is_success() => {
            let checked = if elapsed_ms > config.slow_ms {
                HealthCheckResult::degraded(
                    HTTP_CHECK,
                    true,
                    format!("{} responded slowly ({} ms)", config.url, elapsed_ms),
                )
            } else {
                HealthCheckResult::healthy(
                    HTTP_CHECK,
                    true,
                    format!("{} responded {}", config.url, resp.status()),
                )
            };
            checked.with_detail("status_code", resp.status().as_u16())
        }
        Ok(resp) => HealthCheckResult::unhealthy(
            HTTP_CHECK,
            true,
            format!("{} returned {}", config.url, resp.status()),
        )
        .with_detail("status_code", resp.status().as_u16()),
        Err(e) if e.is_timeout() => HealthCheckResult::unhealthy(
            HTTP_CHECK,
            true,
            format!("{} timed out after {}s", config.url, config.timeout_secs),
        ),
        Err(e) => HealthCheckResult::unhealthy(
            HTTP_CHECK,
            true,
            format!("{} unreachable: {}", config.url, e),
        ),
    };
    result
        .with_detail("url", config.url.clone())
        .with_detail("response_ms", elapsed_ms)
}

pub fn check_directories(dirs: &[String], project_root: &Path) -> HealthCheckResult {
    let missing: Vec<String> = dirs
        .iter()
        .filter(|d| !resolve(project_root, d).is_dir())
        .cloned()
        .collect();

    let result = if missing.is_empty() {
        HealthCheckResult::healthy(
            DIRECTORIES_CHECK,
            false,
            format!("All {} required directories present", dirs.len()),
        )
    } else {
        HealthCheckResult::unhealthy(
            DIRECTORIES_CHECK,
            false,
            format!("Missing directories: {}", missing.join(", ")),
        )
    };
    result.with_detail("missing", missing)
}

pub async fn check_database(config: &DatabaseCheckConfig, project_root: &Path) -> HealthCheckResult {
    let path = resolve(project_root, &config.path);
    if !path.is_file() {
        return HealthCheckResult::unhealthy(
            DATABASE_CHECK,
            false,
            format!("Database file not found: {}", path.display()),
        );
    }

    let probe_path = path.clone();
    let probe = tokio::task::spawn_blocking(move || -> rusqlite::Result<i64> {
        let conn = Connection::open_with_flags(&probe_path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        conn.query_row("SELECT 1", [], |row| row.get(0))
    })
    .await;

    let result = match probe {
        Ok(Ok(_)) => HealthCheckResult::healthy(DATABASE_CHECK, false, "SQLite connection ok"),
        Ok(Err(e)) => HealthCheckResult::unhealthy(
            DATABASE_CHECK,
            false,
            format!("SQLite query failed: {}", e),
        ),
        Err(e) => HealthCheckResult::unhealthy(
            DATABASE_CHECK,
            false,
            format!("SQLite probe aborted: {}", e),
        ),
    };
    debug!("database check {:?} for {}", result.status, path.display());
    result.with_detail("path", path.display().to_string())
}

fn resolve(project_root: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        project_root.join(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirai_common::HealthStatus;
    use tempfile::TempDir;

    #[test]
    fn test_evaluate_usage_thresholds() {
        assert_eq!(evaluate_usage("disk", true, 50.0, 80.0, 90.0).status, HealthStatus::Healthy);
        assert_eq!(evaluate_usage("disk", true, 85.0, 80.0, 90.0).status, HealthStatus::Degraded);

        let result = evaluate_usage("disk", true, 90.0, 80.0, 90.0);
        assert_eq!(result.status, HealthStatus::Unhealthy);
        assert!(result.critical);
        assert_eq!(result.details["used_percent"], serde_json::json!(90.0));
    }

    #[test]
    fn test_check_directories() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("logs")).unwrap();

        let ok = check_directories(&["logs".to_string()], dir.path());
        assert_eq!(ok.status, HealthStatus::Healthy);

        let missing = check_directories(&["logs".to_string(), "data".to_string()], dir.path());
        assert_eq!(missing.status, HealthStatus::Unhealthy);
        assert!(!missing.critical);
        assert!(missing.message.contains("data"));
    }

    #[tokio::test]
    async fn test_check_database() {
        let dir = TempDir::new().unwrap();
        let config = DatabaseCheckConfig {
            path: "knowledge.db".to_string(),
        };

        let absent = check_database(&config, dir.path()).await;
        assert_eq!(absent.status, HealthStatus::Unhealthy);

        Connection::open(dir.path().join("knowledge.db"))
            .unwrap()
            .execute_batch("CREATE TABLE t (x INTEGER);")
            .unwrap();
        let present = check_database(&config, dir.path()).await;
        assert_eq!(present.status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn test_check_port_closed() {
        // Bind then drop to find a port nothing listens on
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = PortCheckConfig {
            host: "127.0.0.1".to_string(),
            port,
            timeout_secs: 1,
        };
        let result = check_port(&config).await;
        assert_eq!(result.status, HealthStatus::Unhealthy);
        assert!(!result.critical);
    }

    #[tokio::test]
    async fn test_check_port_open() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = PortCheckConfig {
            host: "127.0.0.1".to_string(),
            port: listener.local_addr().unwrap().port(),
            timeout_secs: 1,
        };
        assert_eq!(check_port(&config).await.status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn test_check_http_unreachable_is_unhealthy_not_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = HttpCheckConfig {
            url: format!("http://127.0.0.1:{}/api/health", port),
            timeout_secs: 1,
            slow_ms: 1000,
        };
        let result = check_http_endpoint(&reqwest::Client::new(), &config).await;
        assert_eq!(result.status, HealthStatus::Unhealthy);
        assert!(result.critical);
    }
}
