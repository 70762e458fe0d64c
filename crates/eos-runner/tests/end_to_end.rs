//! Full runs in virtual time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use eos_checker::AnomalyType;
use eos_core::{OpFunction, OpKind};
use eos_nemesis::{ActionType, DryRunBackend};
use eos_runner::{RunnerConfig, TestRunner};
use eos_workload::{BrokerClient, BrokerError, Consumed, Produced};

fn sixty_second_run() -> RunnerConfig {
    RunnerConfig {
        duration: Duration::from_secs(60),
        nemesis_interval: Duration::from_secs(10),
        node_ips: vec!["10.0.0.1".into(), "10.0.0.2".into(), "10.0.0.3".into()],
        seed: Some(2024),
        ..RunnerConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn clean_run_passes_with_scheduled_faults() {
    let backend = Arc::new(DryRunBackend::new());
    let result = TestRunner::new(sixty_second_run())
        .with_backend(backend.clone())
        .run()
        .await;

    assert!(result.passed, "anomalies: {:?}", result.anomalies);
    assert!(result.anomalies.is_empty());

    let counts = result.counts();
    assert_eq!(result.total_ops, counts.total);
    assert_eq!(result.ok_ops + counts.invoke, result.total_ops);
    assert_eq!(result.ok_ops, counts.invoke);
    assert_eq!(result.fail_ops, 0);
    assert_eq!(result.info_ops, 0);

    // 3 producers + 2 consumers, one invoke/ok pair each, every 100ms.
    assert_eq!(result.total_ops % 10, 0);
    assert!(result.workload.iterations >= 590);

    // One fault per 10s up to and including the deadline, then teardown heals.
    assert_eq!(result.scheduled_actions, 6);
    let teardown = result.teardown_actions();
    assert!(teardown.len() <= 3);
    assert!(teardown.iter().all(|a| a.action_type == ActionType::Heal));
    assert_eq!(result.nemesis_actions.len(), 6 + teardown.len());
    assert!(!backend.commands().is_empty());
    assert!(result.duration >= Duration::from_secs(60));
    assert!(result.duration < Duration::from_secs(61));
}

#[tokio::test(start_paused = true)]
async fn teardown_leaves_nothing_partitioned() {
    let result = TestRunner::new(sixty_second_run()).run().await;

    let mut partitioned = std::collections::BTreeSet::new();
    for action in &result.nemesis_actions {
        match action.action_type {
            ActionType::Partition => {
                partitioned.insert(action.target.as_str());
            }
            ActionType::Heal => {
                partitioned.remove(action.target.as_str());
            }
            _ => {}
        }
    }
    assert!(partitioned.is_empty());
}

#[tokio::test(start_paused = true)]
async fn empty_node_list_records_noops() {
    let config = RunnerConfig {
        node_ips: Vec::new(),
        ..sixty_second_run()
    };
    let result = TestRunner::new(config).run().await;

    assert!(result.passed);
    let noops = result.actions_of(ActionType::Noop);
    assert_eq!(noops, 6);
    assert_eq!(result.scheduled_actions, 6);
    assert!(result.teardown_actions().is_empty());
    assert_eq!(noops, result.nemesis_actions.len());
    assert!(result
        .nemesis_actions
        .iter()
        .all(|a| a.target.is_empty() && a.description == "No nodes available"));
}

#[tokio::test(start_paused = true)]
async fn seeded_runs_are_reproducible() {
    let first = TestRunner::new(sixty_second_run()).run().await;
    let second = TestRunner::new(sixty_second_run()).run().await;

    let describe = |r: &eos_runner::TestResult| {
        r.nemesis_actions
            .iter()
            .map(|a| a.description.clone())
            .collect::<Vec<_>>()
    };
    assert_eq!(describe(&first), describe(&second));
    assert_eq!(first.total_ops, second.total_ops);
}

/// Broker that re-delivers every third message and times out every fifth produce.
#[derive(Default)]
struct ReplayingBroker {
    produced: AtomicU64,
    consumed: AtomicU64,
}

#[async_trait]
impl BrokerClient for ReplayingBroker {
    fn name(&self) -> &str {
        "replaying"
    }

    async fn produce(&self, _key: &str, _value: &str) -> Result<Produced, BrokerError> {
        let n = self.produced.fetch_add(1, Ordering::SeqCst);
        if n % 5 == 4 {
            return Err(BrokerError::Timeout(Duration::from_secs(1)));
        }
        Ok(Produced {
            offset: n as i64,
            partition: "0".into(),
        })
    }

    async fn consume(&self) -> Result<Consumed, BrokerError> {
        let n = self.consumed.fetch_add(1, Ordering::SeqCst);
        let offset = if n % 3 == 2 { n - 1 } else { n };
        Ok(Consumed {
            key: format!("key-{}", offset),
            offset: offset as i64,
            partition: "0".into(),
        })
    }
}

#[tokio::test(start_paused = true)]
async fn faulty_broker_fails_the_run() {
    let config = RunnerConfig {
        duration: Duration::from_secs(2),
        ..sixty_second_run()
    };
    let result = TestRunner::new(config)
        .with_broker(Arc::new(ReplayingBroker::default()))
        .run()
        .await;

    assert!(!result.passed);
    assert_eq!(result.exit_code(), 1);
    assert!(result.anomalies_of(AnomalyType::DuplicateDelivery) > 0);
    assert!(result.info_ops > 0);
    assert_eq!(result.fail_ops, 0);

    let timeouts = result
        .history
        .iter()
        .filter(|op| op.kind == OpKind::Info && op.function == OpFunction::Produce)
        .count();
    assert_eq!(timeouts, result.info_ops);
}
