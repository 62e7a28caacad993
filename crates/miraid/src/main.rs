use anyhow::{Context, Result};
use clap::Parser;
use miraid::scanner::STDIN_SOURCE;
use miraid::{load_config, AutoFixDaemon};
use mirai_common::CycleReport;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "miraid")]
#[command(about = "Mirai auto-fix daemon", long_about = None)]
#[command(version)]
struct Args {
    /// Daemon config file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Error pattern document, overrides the config
    #[arg(long)]
    patterns: Option<PathBuf>,

    /// Run a single detection cycle and exit
    #[arg(long)]
    once: bool,

    /// Stop after N cycles
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    cycles: Option<u64>,

    /// Also scan standard input during the first cycle
    #[arg(long)]
    stdin: bool,

    /// Print each cycle report as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Seconds between cycles, overrides the config
    #[arg(long)]
    interval: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries reports; logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    info!("[BOOT] Mirai auto-fix daemon v{} starting", env!("CARGO_PKG_VERSION"));

    let mut config = match load_config(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!("[FATAL] {:#}", e);
            std::process::exit(1);
        }
    };
    if let Some(patterns) = args.patterns {
        config.patterns_file = patterns;
    }
    if let Some(interval) = args.interval {
        config.cycle_interval_secs = interval;
    }

    let mut daemon = match AutoFixDaemon::from_config(config) {
        Ok(d) => d,
        Err(e) => {
            error!("[FATAL] {:#}", e);
            std::process::exit(1);
        }
    };

    if args.stdin {
        let queued = daemon
            .queue_source(std::io::stdin().lock(), STDIN_SOURCE)
            .context("Failed to read standard input")?;
        info!("[BOOT] {} detections queued from stdin", queued);
    }

    let max_cycles = if args.once {
        Some(1)
    } else {
        args.cycles.or(if args.stdin { Some(1) } else { None })
    };

    let json = args.json;
    daemon
        .run(max_cycles, |report| {
            if json {
                print_report(report);
            }
        })
        .await;

    info!("Shutting down gracefully");
    Ok(())
}

fn print_report(report: &CycleReport) {
    match serde_json::to_string_pretty(report) {
        Ok(out) => println!("{}", out),
        Err(e) => error!("Failed to serialize cycle report: {}", e),
    }
}
