//! EOS Workload - produce/consume traffic generation
//!
//! The [`WorkloadDriver`] runs a fixed set of producer and consumer actors
//! against a [`BrokerClient`] and records every call as an invoke/completion
//! pair in a shared [`History`](eos_core::History).
//!
//! The bundled [`SimulatedBroker`] never talks to a network. It hands out
//! offsets from run-global counters and spreads them over partitions
//! round-robin, so a history produced against it is always clean.

pub mod broker;
pub mod driver;

pub use broker::{BrokerClient, BrokerError, Consumed, Produced, SimulatedBroker};
pub use driver::{WorkloadConfig, WorkloadDriver, WorkloadStats};
