//! EOS Harness - exactly-once verification for a distributed log.
//!
//! Runs a produce/consume workload for a fixed duration while a nemesis
//! injects network faults, then checks the recorded history for duplicate
//! deliveries and per-partition offset regressions.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: 60s run, a fault every 10s, reports under /results
//! eos-harness
//!
//! # With a configuration file
//! eos-harness --config /path/to/harness.toml
//!
//! # Environment and flags override the file
//! NODE_IPS=10.0.0.1,10.0.0.2 eos-harness --duration-secs 30 --seed 7
//! ```
//!
//! # Exit status
//!
//! - `0`: no anomalies
//! - `1`: at least one anomaly
//! - `2`: configuration could not be loaded or reports could not be written

mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use config::HarnessConfig;
use eos_report::{summary_banner, write_reports_to_directory, Report};
use eos_runner::TestRunner;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const EXIT_ERROR: u8 = 2;

/// CLI arguments for the EOS harness.
#[derive(Parser, Debug)]
#[command(
    name = "eos-harness",
    about = "Exactly-once verification harness for a distributed log",
    version
)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Enable JSON log output.
    #[arg(long)]
    json_logs: bool,

    /// Directory to write reports into.
    #[arg(short, long, value_name = "DIR")]
    results_dir: Option<PathBuf>,

    /// Workload duration in seconds.
    #[arg(short, long, value_name = "SECS")]
    duration_secs: Option<u64>,

    /// Seconds between fault injections (0 disables the nemesis).
    #[arg(short, long, value_name = "SECS")]
    nemesis_interval_secs: Option<u64>,

    /// Seed for reproducible runs.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Print the effective configuration and exit.
    #[arg(long)]
    print_config: bool,
}

/// Initialize tracing based on configuration.
fn init_tracing(config: &config::LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .context("Failed to parse log filter")?;

    match config.format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json())
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;
        }
        "compact" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact())
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().pretty())
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;
        }
    }

    Ok(())
}

/// Resolves defaults, file, environment and flags into one configuration.
///
/// Returns the configuration and any warnings still to be logged.
fn load_config(args: &CliArgs) -> Result<(HarnessConfig, Vec<String>)> {
    let mut config = if let Some(ref config_path) = args.config {
        HarnessConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    } else {
        HarnessConfig::default()
    };

    let mut warnings = config.apply_env(|key| std::env::var(key).ok());
    config.merge_cli_args(args);
    warnings.extend(config.normalize());
    config.validate().context("Invalid configuration")?;

    Ok((config, warnings))
}

/// Runs the test and writes reports. Returns the process exit code.
async fn run(config: HarnessConfig) -> Result<u8> {
    let runner = TestRunner::new(config.runner_config());
    let result = runner.run().await;

    let report = Report::from_result(&result, Utc::now());
    let paths = write_reports_to_directory(&report, &config.output.results_dir).with_context(
        || format!("Failed to write reports to {:?}", config.output.results_dir),
    )?;

    println!("\n{}", summary_banner(&report));
    println!("Reports: {}, {}", paths.json.display(), paths.markdown.display());

    Ok(result.exit_code())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    let (config, warnings) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if args.print_config {
        return match toml::to_string_pretty(&config) {
            Ok(rendered) => {
                println!("{}", rendered);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: failed to render configuration: {}", e);
                ExitCode::from(EXIT_ERROR)
            }
        };
    }

    if let Err(e) = init_tracing(&config.logging) {
        eprintln!("Error: {:#}", e);
        return ExitCode::from(EXIT_ERROR);
    }
    for warning in &warnings {
        warn!("{}", warning);
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        name = %config.test.name,
        "EOS harness starting"
    );

    match run(config).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!(error = %format!("{:#}", e), "Harness failed");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_args_parsing() {
        let args = CliArgs::parse_from(["eos-harness"]);
        assert!(args.config.is_none());
        assert!(args.seed.is_none());
        assert!(!args.json_logs);
        assert!(!args.print_config);
    }

    #[test]
    fn test_cli_args_with_options() {
        let args = CliArgs::parse_from([
            "eos-harness",
            "--config",
            "/etc/eos/harness.toml",
            "--log-level",
            "debug",
            "--duration-secs",
            "30",
            "--nemesis-interval-secs",
            "5",
            "--results-dir",
            "/tmp/results",
            "--seed",
            "11",
            "--json-logs",
        ]);

        assert_eq!(args.config, Some(PathBuf::from("/etc/eos/harness.toml")));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert_eq!(args.duration_secs, Some(30));
        assert_eq!(args.nemesis_interval_secs, Some(5));
        assert_eq!(args.seed, Some(11));
        assert!(args.json_logs);
    }

    #[test]
    fn test_cli_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harness.toml");
        std::fs::write(&path, "[test]\nduration_secs = 15\nnemesis_interval_secs = 3\n").unwrap();

        let args = CliArgs::parse_from([
            "eos-harness",
            "--config",
            path.to_str().unwrap(),
            "--duration-secs",
            "20",
            "--json-logs",
        ]);

        let mut config = HarnessConfig::from_file(&path).unwrap();
        config.merge_cli_args(&args);

        assert_eq!(config.test.duration_secs, 20);
        assert_eq!(config.test.nemesis_interval_secs, 3);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_load_config_normalizes_file_and_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harness.toml");
        std::fs::write(&path, "[logging]\nlevel = \"INFO\"\nformat = \"JSON\"\n").unwrap();

        let max = u64::MAX.to_string();
        let args = CliArgs::parse_from([
            "eos-harness",
            "--config",
            path.to_str().unwrap(),
            "--duration-secs",
            max.as_str(),
            "--nemesis-interval-secs",
            max.as_str(),
        ]);

        let (config, warnings) = load_config(&args).unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.test.duration_secs, config::MAX_RUN_SECS);
        assert_eq!(config.test.nemesis_interval_secs, config::MAX_RUN_SECS);
        assert!(warnings.iter().any(|w| w.contains("duration_secs")));
        assert!(warnings.iter().any(|w| w.contains("nemesis_interval_secs")));
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let args = CliArgs::parse_from(["eos-harness", "--config", "/nonexistent/harness.toml"]);
        assert!(load_config(&args).is_err());
    }
}
