//! EOS Runner - test orchestration
//!
//! [`TestRunner`] wires the pieces of one verification run together:
//!
//! 1. start the [`WorkloadDriver`](eos_workload::WorkloadDriver) in its own task
//! 2. inject a random fault once per nemesis interval until the deadline
//! 3. stop the workload and heal every partitioned node
//! 4. run the [`EosChecker`](eos_checker::EosChecker) over the history
//! 5. assemble a [`TestResult`]
//!
//! A run always produces a result. Broker errors end up in the history and
//! fault backend errors end up in the log; neither aborts the run.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use eos_runner::{RunnerConfig, TestRunner};
//!
//! # async fn demo() {
//! let config = RunnerConfig {
//!     duration: Duration::from_secs(5),
//!     nemesis_interval: Duration::from_secs(1),
//!     node_ips: vec!["10.0.0.1".into(), "10.0.0.2".into()],
//!     ..RunnerConfig::default()
//! };
//!
//! let result = TestRunner::new(config).run().await;
//! println!("passed: {}", result.passed);
//! # }
//! ```

pub mod config;
pub mod result;
pub mod runner;

pub use config::RunnerConfig;
pub use result::TestResult;
pub use runner::TestRunner;

pub use eos_core::OpCounts;
