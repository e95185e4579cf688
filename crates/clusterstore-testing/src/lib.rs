//! # clusterstore-testing
//!
//! Test infrastructure for the clusterstore session pool: an
//! in-memory [`MemoryBackend`] with fault injection and operation
//! counters, standing in for the real clustered store.
//!
//! Pool-dependent scenario tests live in this crate's `tests/`
//! directory rather than in `clusterstore-pool` itself, to keep the
//! dependency graph acyclic.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod memory;

pub use memory::{BackendCounters, InjectedFault, MemoryBackend, MockDto};
