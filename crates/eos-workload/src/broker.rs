//! Broker client abstraction and the simulated broker.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

/// Errors a broker round-trip can report.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// No answer arrived in time; the request may or may not have applied.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The broker could not be reached.
    #[error("broker unavailable: {0}")]
    Unavailable(String),

    /// The broker refused the request.
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl BrokerError {
    /// Returns true when the outcome of the request is unknown.
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Acknowledgement of a produce call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Produced {
    /// Offset assigned to the message.
    pub offset: i64,
    /// Partition the message landed in.
    pub partition: String,
}

/// A message returned by a consume call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consumed {
    /// Message key.
    pub key: String,
    /// Offset within the partition.
    pub offset: i64,
    /// Partition the message was read from.
    pub partition: String,
}

/// Produce/consume capability the workload drives.
///
/// Swapping the implementation does not touch the driver, the history or the
/// checker.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Returns the name of this client for logging.
    fn name(&self) -> &str;

    /// Appends a message.
    async fn produce(&self, key: &str, value: &str) -> Result<Produced, BrokerError>;

    /// Reads the next message.
    async fn consume(&self) -> Result<Consumed, BrokerError>;
}

struct SimulatedState {
    produce_count: u64,
    consume_count: u64,
    rng: ChaCha8Rng,
}

/// In-memory broker that always succeeds.
///
/// Produce and consume counters are independent and global across
/// partitions; the partition of the n-th call is `n % partitions`.
pub struct SimulatedBroker {
    partitions: u32,
    keyspace: u32,
    state: Mutex<SimulatedState>,
}

impl SimulatedBroker {
    /// Default number of distinct keys (`key-0` to `key-99`).
    pub const DEFAULT_KEYSPACE: u32 = 100;

    /// Creates a broker with `partitions` partitions and an entropy seed.
    pub fn new(partitions: u32) -> Self {
        Self::from_rng(partitions, ChaCha8Rng::from_entropy())
    }

    /// Creates a broker whose consume keys are reproducible.
    pub fn with_seed(partitions: u32, seed: u64) -> Self {
        Self::from_rng(partitions, ChaCha8Rng::seed_from_u64(seed))
    }

    fn from_rng(partitions: u32, rng: ChaCha8Rng) -> Self {
        Self {
            partitions: partitions.max(1),
            keyspace: Self::DEFAULT_KEYSPACE,
            state: Mutex::new(SimulatedState {
                produce_count: 0,
                consume_count: 0,
                rng,
            }),
        }
    }

    /// Sets the number of distinct consume keys.
    pub fn with_keyspace(mut self, keyspace: u32) -> Self {
        self.keyspace = keyspace.max(1);
        self
    }

    /// Number of partitions offsets are spread over.
    pub fn partitions(&self) -> u32 {
        self.partitions
    }

    fn partition_of(&self, count: u64) -> String {
        (count % u64::from(self.partitions)).to_string()
    }

    fn lock(&self) -> MutexGuard<'_, SimulatedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SimulatedBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("SimulatedBroker")
            .field("partitions", &self.partitions)
            .field("keyspace", &self.keyspace)
            .field("produce_count", &state.produce_count)
            .field("consume_count", &state.consume_count)
            .finish()
    }
}

#[async_trait]
impl BrokerClient for SimulatedBroker {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn produce(&self, _key: &str, _value: &str) -> Result<Produced, BrokerError> {
        let mut state = self.lock();
        let count = state.produce_count;
        state.produce_count += 1;
        Ok(Produced {
            offset: count as i64,
            partition: self.partition_of(count),
        })
    }

    async fn consume(&self) -> Result<Consumed, BrokerError> {
        let mut state = self.lock();
        let count = state.consume_count;
        state.consume_count += 1;
        let key = format!("key-{}", state.rng.gen_range(0..self.keyspace));
        Ok(Consumed {
            key,
            offset: count as i64,
            partition: self.partition_of(count),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_produce_offsets_round_robin() {
        let broker = SimulatedBroker::with_seed(3, 7);

        let mut acks = Vec::new();
        for _ in 0..4 {
            acks.push(broker.produce("key-1", "val").await.unwrap());
        }

        let offsets: Vec<i64> = acks.iter().map(|a| a.offset).collect();
        let partitions: Vec<&str> = acks.iter().map(|a| a.partition.as_str()).collect();
        assert_eq!(offsets, vec![0, 1, 2, 3]);
        assert_eq!(partitions, vec!["0", "1", "2", "0"]);
    }

    #[tokio::test]
    async fn test_consume_counter_is_independent() {
        let broker = SimulatedBroker::with_seed(3, 7);
        broker.produce("key-1", "val").await.unwrap();
        broker.produce("key-2", "val").await.unwrap();

        let first = broker.consume().await.unwrap();
        assert_eq!(first.offset, 0);
        assert_eq!(first.partition, "0");
        assert!(first.key.starts_with("key-"));
    }

    #[tokio::test]
    async fn test_keys_stay_in_keyspace() {
        let broker = SimulatedBroker::with_seed(1, 3).with_keyspace(5);
        for _ in 0..50 {
            let msg = broker.consume().await.unwrap();
            let n: u32 = msg.key.trim_start_matches("key-").parse().unwrap();
            assert!(n < 5);
        }
    }

    #[tokio::test]
    async fn test_seeded_keys_are_reproducible() {
        let a = SimulatedBroker::with_seed(3, 99);
        let b = SimulatedBroker::with_seed(3, 99);
        for _ in 0..10 {
            assert_eq!(a.consume().await.unwrap(), b.consume().await.unwrap());
        }
    }

    #[test]
    fn test_zero_partitions_clamped() {
        assert_eq!(SimulatedBroker::new(0).partitions(), 1);
    }

    #[test]
    fn test_only_timeout_is_indeterminate() {
        assert!(BrokerError::Timeout(Duration::from_secs(1)).is_indeterminate());
        assert!(!BrokerError::Unavailable("down".into()).is_indeterminate());
        assert!(!BrokerError::Rejected("nope".into()).is_indeterminate());
    }
}
