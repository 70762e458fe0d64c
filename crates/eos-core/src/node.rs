//! Logical actor identification.
//!
//! Producers and consumers share a single numeric id space. Consumers are
//! offset by [`CONSUMER_PROCESS_BASE`] so the two ranges never collide.

use serde::{Deserialize, Serialize};
use std::fmt;

/// First process id handed to consumer actors.
pub const CONSUMER_PROCESS_BASE: u32 = 100;

/// Identifier for a logical actor issuing operations.
///
/// # Examples
///
/// ```
/// use eos_core::node::ProcessId;
///
/// assert_eq!(ProcessId::producer(2), ProcessId(2));
/// assert_eq!(ProcessId::consumer(1), ProcessId(101));
/// assert!(ProcessId::consumer(0).is_consumer());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(pub u32);

impl ProcessId {
    /// Creates a new ProcessId with the given value.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Process id of the `n`th producer.
    #[inline]
    pub const fn producer(n: u32) -> Self {
        Self(n)
    }

    /// Process id of the `n`th consumer.
    #[inline]
    pub const fn consumer(n: u32) -> Self {
        Self(CONSUMER_PROCESS_BASE + n)
    }

    /// Returns the inner value of the ProcessId.
    #[inline]
    pub const fn inner(self) -> u32 {
        self.0
    }

    /// Returns true if this id falls in the consumer range.
    #[inline]
    pub const fn is_consumer(self) -> bool {
        self.0 >= CONSUMER_PROCESS_BASE
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Process({})", self.0)
    }
}

impl From<u32> for ProcessId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<ProcessId> for u32 {
    fn from(id: ProcessId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_producer_and_consumer_ranges_are_disjoint() {
        for n in 0..10 {
            assert!(!ProcessId::producer(n).is_consumer());
            assert!(ProcessId::consumer(n).is_consumer());
            assert_ne!(ProcessId::producer(n), ProcessId::consumer(n));
        }
    }

    #[test]
    fn test_process_id_display() {
        assert_eq!(format!("{}", ProcessId(101)), "Process(101)");
    }

    #[test]
    fn test_process_id_serializes_as_number() {
        let json = serde_json::to_string(&ProcessId(7)).unwrap();
        assert_eq!(json, "7");
    }
}
