//! Runner configuration.

use std::time::Duration;

use eos_workload::WorkloadConfig;

/// Everything one run needs. Built once by the caller and passed in.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Test name carried into the result.
    pub name: String,
    /// Wall-clock length of the workload.
    pub duration: Duration,
    /// Time between fault injections; zero disables the nemesis.
    pub nemesis_interval: Duration,
    /// Broker endpoints, informational only.
    pub nodes: Vec<String>,
    /// Nodes eligible for fault injection.
    pub node_ips: Vec<String>,
    /// Workload shape.
    pub workload: WorkloadConfig,
    /// Seed for every random decision in the run.
    pub seed: Option<u64>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            name: "eos-linearizability".to_string(),
            duration: Duration::from_secs(60),
            nemesis_interval: Duration::from_secs(10),
            nodes: vec!["localhost:9092".to_string()],
            node_ips: Vec::new(),
            workload: WorkloadConfig::default(),
            seed: None,
        }
    }
}

impl RunnerConfig {
    /// Seed for the nemesis RNG.
    pub(crate) fn nemesis_seed(&self) -> Option<u64> {
        self.seed
    }

    /// Seed for the workload key generator, unless the workload has its own.
    pub(crate) fn workload_seed(&self) -> Option<u64> {
        self.workload.seed.or(self.seed.map(|s| s.wrapping_add(1)))
    }

    /// Seed for the simulated broker.
    pub(crate) fn broker_seed(&self) -> Option<u64> {
        self.seed.map(|s| s.wrapping_add(2))
    }
}
