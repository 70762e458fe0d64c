//! Harness configuration.
//!
//! Sources, lowest precedence first: built-in defaults, an optional TOML
//! file, environment variables, then CLI flags.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use eos_runner::RunnerConfig;
use eos_workload::WorkloadConfig;
use serde::{Deserialize, Serialize};

/// Longest accepted run length and nemesis interval: 30 days.
pub const MAX_RUN_SECS: u64 = 30 * 24 * 60 * 60;

/// Harness configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Run timing and identity.
    pub test: TestSection,

    /// Cluster and workload shape.
    pub cluster: ClusterConfig,

    /// Where reports go.
    pub output: OutputConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Run timing and identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TestSection {
    /// Name carried into the report.
    pub name: String,

    /// Workload length in seconds.
    pub duration_secs: u64,

    /// Seconds between fault injections (0 disables the nemesis).
    pub nemesis_interval_secs: u64,

    /// Seed for every random decision; entropy when unset.
    pub seed: Option<u64>,
}

impl Default for TestSection {
    fn default() -> Self {
        Self {
            name: "eos-linearizability".to_string(),
            duration_secs: 60,
            nemesis_interval_secs: 10,
            seed: None,
        }
    }
}

/// Cluster and workload shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Broker endpoints.
    pub nodes: Vec<String>,

    /// Hosts eligible for fault injection.
    pub node_ips: Vec<String>,

    /// Topic under test.
    pub topic: String,

    /// Topic partitions.
    pub partitions: u32,

    /// Producer actors.
    pub producers: u32,

    /// Consumer actors.
    pub consumers: u32,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            nodes: vec!["localhost:9092".to_string()],
            node_ips: Vec::new(),
            topic: "jepsen-test".to_string(),
            partitions: 3,
            producers: 3,
            consumers: 2,
        }
    }
}

/// Report output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory the JSON and Markdown reports are written to.
    pub results_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("/results"),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,

    /// Log format (pretty, json, compact).
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl HarnessConfig {
    /// Loads configuration from a file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Overlays environment variables read through `lookup`.
    ///
    /// Returns one warning per value that could not be parsed; the previous
    /// value is kept in that case. Tracing is not up yet when this runs, so
    /// the caller logs the warnings later.
    pub fn apply_env<F>(&mut self, lookup: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut warnings = Vec::new();

        if let Some(nodes) = lookup("NODES") {
            self.cluster.nodes = split_list(&nodes);
        }
        if let Some(ips) = lookup("NODE_IPS") {
            self.cluster.node_ips = split_list(&ips);
        }
        if let Some(dir) = lookup("RESULTS_DIR") {
            if !dir.trim().is_empty() {
                self.output.results_dir = PathBuf::from(dir.trim());
            }
        }

        parse_into(&lookup, "TEST_DURATION_SECS", &mut self.test.duration_secs, &mut warnings);
        parse_into(
            &lookup,
            "NEMESIS_INTERVAL_SECS",
            &mut self.test.nemesis_interval_secs,
            &mut warnings,
        );

        let mut seed = self.test.seed.unwrap_or_default();
        if parse_into(&lookup, "SEED", &mut seed, &mut warnings) {
            self.test.seed = Some(seed);
        }

        warnings
    }

    /// Merges CLI arguments into the configuration.
    pub fn merge_cli_args(&mut self, args: &super::CliArgs) {
        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
        if let Some(ref dir) = args.results_dir {
            self.output.results_dir = dir.clone();
        }
        if let Some(duration) = args.duration_secs {
            self.test.duration_secs = duration;
        }
        if let Some(interval) = args.nemesis_interval_secs {
            self.test.nemesis_interval_secs = interval;
        }
        if let Some(seed) = args.seed {
            self.test.seed = Some(seed);
        }
        if args.json_logs {
            self.logging.format = "json".to_string();
        }
    }

    /// Clamps timings to [`MAX_RUN_SECS`] and lowercases the logging
    /// settings. Returns a warning per adjusted value.
    pub fn normalize(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();

        for (name, slot) in [
            ("duration_secs", &mut self.test.duration_secs),
            ("nemesis_interval_secs", &mut self.test.nemesis_interval_secs),
        ] {
            if *slot > MAX_RUN_SECS {
                warnings.push(format!(
                    "Clamping {}={} to {} seconds",
                    name, slot, MAX_RUN_SECS
                ));
                *slot = MAX_RUN_SECS;
            }
        }

        self.logging.level = self.logging.level.trim().to_lowercase();
        self.logging.format = self.logging.format.trim().to_lowercase();

        warnings
    }

    /// Validates the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("Invalid log level: {}", self.logging.level);
        }

        let valid_formats = ["pretty", "json", "compact"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            anyhow::bail!("Invalid log format: {}", self.logging.format);
        }

        if self.test.name.trim().is_empty() {
            anyhow::bail!("Test name must not be empty");
        }
        if self.cluster.partitions == 0 {
            anyhow::bail!("Partition count must be at least 1");
        }
        if self.cluster.producers == 0 && self.cluster.consumers == 0 {
            anyhow::bail!("At least one producer or consumer is required");
        }

        Ok(())
    }

    /// Builds the runner configuration.
    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            name: self.test.name.clone(),
            duration: Duration::from_secs(self.test.duration_secs),
            nemesis_interval: Duration::from_secs(self.test.nemesis_interval_secs),
            nodes: self.cluster.nodes.clone(),
            node_ips: self.cluster.node_ips.clone(),
            workload: WorkloadConfig {
                producers: self.cluster.producers,
                consumers: self.cluster.consumers,
                partitions: self.cluster.partitions,
                topic: self.cluster.topic.clone(),
                ..WorkloadConfig::default()
            },
            seed: self.test.seed,
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parses `name` into `slot`. Returns true if the slot was updated.
fn parse_into<F, T>(lookup: &F, name: &str, slot: &mut T, warnings: &mut Vec<String>) -> bool
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Display,
{
    let Some(raw) = lookup(name) else {
        return false;
    };
    match raw.trim().parse() {
        Ok(value) => {
            *slot = value;
            true
        }
        Err(_) => {
            warnings.push(format!(
                "Ignoring {}={:?}: not a valid number, keeping {}",
                name, raw, slot
            ));
            false
        }
    }
}
