//! The orchestrator loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use eos_checker::{Checker, EosChecker};
use eos_core::{History, RunId};
use eos_nemesis::{FaultBackend, FaultScheduler};
use eos_workload::{BrokerClient, SimulatedBroker, WorkloadDriver, WorkloadStats};
use tokio::sync::broadcast;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use crate::{RunnerConfig, TestResult};

/// Stand-in for "never" when a configured duration overflows the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `start + offset`, saturating at a far-future instant instead of panicking.
fn deadline_after(start: Instant, offset: Duration) -> Instant {
    start
        .checked_add(offset)
        .or_else(|| start.checked_add(FAR_FUTURE))
        .unwrap_or(start)
}

/// Runs one verification test.
pub struct TestRunner {
    config: RunnerConfig,
    broker: Option<Arc<dyn BrokerClient>>,
    backend: Option<Arc<dyn FaultBackend>>,
}

impl TestRunner {
    /// Creates a runner using the simulated broker and the dry-run backend.
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config,
            broker: None,
            backend: None,
        }
    }

    /// Drives the workload against `broker` instead of the simulated one.
    pub fn with_broker(mut self, broker: Arc<dyn BrokerClient>) -> Self {
        self.broker = Some(broker);
        self
    }

    /// Hands fault intents to `backend` instead of the dry-run one.
    pub fn with_backend(mut self, backend: Arc<dyn FaultBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// The configuration this runner was built with.
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Runs the test to completion. Never fails; the verdict is in the result.
    #[instrument(skip(self), fields(name = %self.config.name))]
    pub async fn run(&self) -> TestResult {
        let run_id = RunId::new();
        let history = Arc::new(History::new(run_id));
        let scheduler = self.build_scheduler();
        let broker = self.build_broker();

        info!(
            %run_id,
            duration_secs = self.config.duration.as_secs_f64(),
            nemesis_interval_secs = self.config.nemesis_interval.as_secs_f64(),
            nodes = ?self.config.nodes,
            fault_targets = scheduler.node_ips().len(),
            "Starting test run"
        );

        let started_at = Utc::now();
        let start = Instant::now();
        let deadline = deadline_after(start, self.config.duration);

        let mut workload_config = self.config.workload.clone();
        workload_config.seed = self.config.workload_seed();
        let driver = WorkloadDriver::new(workload_config, broker, Arc::clone(&history));

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let workload = tokio::spawn(driver.run(deadline, shutdown_rx));

        self.run_nemesis(&scheduler, start, deadline).await;

        // Receiver may already be gone if the workload saw the deadline first.
        let _ = shutdown_tx.send(());
        let workload_stats = match workload.await {
            Ok(stats) => stats,
            Err(e) => {
                error!(error = %e, "Workload task did not complete");
                WorkloadStats::default()
            }
        };

        let scheduled_actions = scheduler.action_count();
        let healed = scheduler.heal_all();
        debug!(healed = healed.len(), "Teardown heal complete");

        let operations = history.snapshot();
        let check = EosChecker::new().check(&operations);
        let counts = history.counts();
        let duration = start.elapsed();

        info!(
            passed = check.passed,
            total_ops = counts.total,
            anomalies = check.anomalies.len(),
            nemesis_actions = scheduler.action_count(),
            "Test run complete"
        );

        TestResult {
            run_id,
            name: self.config.name.clone(),
            passed: check.passed,
            total_ops: counts.total,
            ok_ops: counts.ok,
            fail_ops: counts.fail,
            info_ops: counts.info,
            duration,
            started_at,
            history: operations,
            nemesis_actions: scheduler.actions(),
            scheduled_actions,
            anomalies: check.anomalies,
            workload: workload_stats,
        }
    }

    /// Fires one random fault per interval, the first one interval after
    /// `start`, the last one no later than `deadline`.
    async fn run_nemesis(&self, scheduler: &FaultScheduler, start: Instant, deadline: Instant) {
        let period = self.config.nemesis_interval;
        if period.is_zero() {
            warn!("Nemesis interval is zero, fault injection disabled");
            sleep_until(deadline).await;
            return;
        }

        let first_tick = deadline_after(start, period);
        if first_tick > deadline {
            debug!("Nemesis interval exceeds the run, no faults scheduled");
            sleep_until(deadline).await;
            return;
        }

        let mut ticker = interval_at(first_tick, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let end = sleep_until(deadline);
        tokio::pin!(end);

        loop {
            tokio::select! {
                biased;
                _ = ticker.tick() => {
                    let action = scheduler.random_fault();
                    debug!(
                        elapsed_secs = start.elapsed().as_secs_f64(),
                        action = %action,
                        "Nemesis fired"
                    );
                }
                _ = &mut end => break,
            }
        }
    }

    fn build_scheduler(&self) -> FaultScheduler {
        let node_ips = self.config.node_ips.iter().cloned();
        let scheduler = match self.config.nemesis_seed() {
            Some(seed) => FaultScheduler::with_seed(node_ips, seed),
            None => FaultScheduler::new(node_ips),
        };
        match &self.backend {
            Some(backend) => scheduler.with_backend(Arc::clone(backend)),
            None => scheduler,
        }
    }

    fn build_broker(&self) -> Arc<dyn BrokerClient> {
        if let Some(broker) = &self.broker {
            return Arc::clone(broker);
        }
        let partitions = self.config.workload.partitions;
        let broker = match self.config.broker_seed() {
            Some(seed) => SimulatedBroker::with_seed(partitions, seed),
            None => SimulatedBroker::new(partitions),
        };
        Arc::new(broker.with_keyspace(self.config.workload.keyspace))
    }
}

impl std::fmt::Debug for TestRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestRunner")
            .field("config", &self.config)
            .field("broker", &self.broker.as_ref().map(|b| b.name().to_string()))
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .finish()
    }
}
