//! The workload loop.

use std::sync::Arc;
use std::time::Duration;

use eos_core::{History, OpFunction, OpKind, Payload, ProcessId};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::broker::{BrokerClient, BrokerError};

/// Workload shape.
#[derive(Debug, Clone)]
pub struct WorkloadConfig {
    /// Producer actors per iteration.
    pub producers: u32,
    /// Consumer actors per iteration.
    pub consumers: u32,
    /// Topic partitions, used when building the default broker.
    pub partitions: u32,
    /// Topic name recorded on consume invocations.
    pub topic: String,
    /// Number of distinct producer keys.
    pub keyspace: u32,
    /// Pause between iterations.
    pub cadence: Duration,
    /// Seed for key generation; entropy when unset.
    pub seed: Option<u64>,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            producers: 3,
            consumers: 2,
            partitions: 3,
            topic: "jepsen-test".to_string(),
            keyspace: 100,
            cadence: Duration::from_millis(100),
            seed: None,
        }
    }
}

/// Counters for one workload run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkloadStats {
    /// Completed loop iterations.
    pub iterations: u64,
    /// Successful produces.
    pub produced: u64,
    /// Successful consumes.
    pub consumed: u64,
    /// Calls completed as `fail`.
    pub failed: u64,
    /// Calls completed as `info`.
    pub indeterminate: u64,
}

/// Drives producers and consumers against a broker, recording every call.
pub struct WorkloadDriver {
    config: WorkloadConfig,
    broker: Arc<dyn BrokerClient>,
    history: Arc<History>,
    rng: ChaCha8Rng,
    value_seq: u64,
    stats: WorkloadStats,
}

impl WorkloadDriver {
    /// Creates a driver writing into `history`.
    pub fn new(config: WorkloadConfig, broker: Arc<dyn BrokerClient>, history: Arc<History>) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            config,
            broker,
            history,
            rng,
            value_seq: 0,
            stats: WorkloadStats::default(),
        }
    }

    /// Counters so far.
    pub fn stats(&self) -> WorkloadStats {
        self.stats
    }

    /// Runs every producer once, then every consumer once.
    ///
    /// Each actor records its invoke before calling the broker and its
    /// completion right after.
    pub async fn run_iteration(&mut self) {
        for producer in 0..self.config.producers {
            self.produce_once(ProcessId::producer(producer)).await;
        }
        for consumer in 0..self.config.consumers {
            self.consume_once(ProcessId::consumer(consumer)).await;
        }
        self.stats.iterations += 1;
    }

    /// Iterates until `deadline` passes or `shutdown` fires.
    ///
    /// Time is only checked between iterations, so a run can overshoot the
    /// deadline by one iteration.
    pub async fn run(mut self, deadline: Instant, mut shutdown: broadcast::Receiver<()>) -> WorkloadStats {
        info!(
            broker = self.broker.name(),
            producers = self.config.producers,
            consumers = self.config.consumers,
            cadence_ms = self.config.cadence.as_millis() as u64,
            "Workload started"
        );

        while Instant::now() < deadline {
            self.run_iteration().await;

            tokio::select! {
                _ = shutdown.recv() => break,
                _ = sleep(self.config.cadence) => {}
            }
        }

        info!(
            iterations = self.stats.iterations,
            produced = self.stats.produced,
            consumed = self.stats.consumed,
            failed = self.stats.failed,
            indeterminate = self.stats.indeterminate,
            "Workload stopped"
        );
        self.stats
    }

    async fn produce_once(&mut self, process: ProcessId) {
        let key = format!("key-{}", self.rng.gen_range(0..self.config.keyspace.max(1)));
        let value = format!("val-{}", self.value_seq);
        self.value_seq += 1;

        let invoke = into_payload(json!({ "key": key, "value": value }));
        self.history
            .record(OpKind::Invoke, OpFunction::Produce, invoke.clone(), process);

        match self.broker.produce(&key, &value).await {
            Ok(ack) => {
                let payload = into_payload(json!({
                    "key": key,
                    "value": value,
                    "offset": ack.offset,
                    "partition": ack.partition,
                }));
                self.history
                    .record(OpKind::Ok, OpFunction::Produce, payload, process);
                self.stats.produced += 1;
            }
            Err(err) => self.record_error(OpFunction::Produce, invoke, process, &err),
        }
    }

    async fn consume_once(&mut self, process: ProcessId) {
        let invoke = into_payload(json!({ "topic": self.config.topic }));
        self.history
            .record(OpKind::Invoke, OpFunction::Consume, invoke.clone(), process);

        match self.broker.consume().await {
            Ok(msg) => {
                let payload = into_payload(json!({
                    "key": msg.key,
                    "offset": msg.offset,
                    "partition": msg.partition,
                }));
                self.history
                    .record(OpKind::Ok, OpFunction::Consume, payload, process);
                self.stats.consumed += 1;
            }
            Err(err) => self.record_error(OpFunction::Consume, invoke, process, &err),
        }
    }

    fn record_error(
        &mut self,
        function: OpFunction,
        mut payload: Payload,
        process: ProcessId,
        err: &BrokerError,
    ) {
        let kind = if err.is_indeterminate() {
            self.stats.indeterminate += 1;
            OpKind::Info
        } else {
            self.stats.failed += 1;
            OpKind::Fail
        };
        payload.insert("error".to_string(), Value::String(err.to_string()));

        warn!(%process, %function, %kind, error = %err, "Broker call did not succeed");
        let op = self.history.record(kind, function, payload, process);
        debug!(index = op.index, "Recorded failed completion");
    }
}

impl std::fmt::Debug for WorkloadDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkloadDriver")
            .field("config", &self.config)
            .field("broker", &self.broker.name())
            .field("stats", &self.stats)
            .finish()
    }
}

fn into_payload(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        _ => Payload::new(),
    }
}
