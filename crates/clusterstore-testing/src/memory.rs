//! In-memory store backend with fault injection.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use thiserror::Error;

use clusterstore_client::{BackendSession, DtoType, DtoValue, StoreBackend, StoreConfig, StoreError};

/// Failure modes the mock backend can inject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InjectedFault {
    /// The store factory refuses the connection.
    #[error("injected fault: store unreachable")]
    StoreUnreachable,
    /// DTO allocation fails on an open session.
    #[error("injected fault: instance allocation failed")]
    AllocationFailed,
    /// Closing a session fails.
    #[error("injected fault: session close failed")]
    CloseFailed,
}

/// Operation counters shared between a backend and its sessions.
#[derive(Debug, Default)]
pub struct BackendCounters {
    /// Sessions opened so far.
    pub sessions_opened: AtomicUsize,
    /// Sessions closed so far.
    pub sessions_closed: AtomicUsize,
    /// DTO instances allocated so far.
    pub instances_allocated: AtomicUsize,
}

/// The opaque instance type the mock allocates.
///
/// Tests downcast [`DtoValue`]s handed out by a session to this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockDto {
    /// The type this instance was allocated for.
    pub dto: DtoType,
    /// Global allocation sequence number.
    pub seq: usize,
}

/// In-memory [`StoreBackend`] for tests.
///
/// Sessions are plain counters; faults are injected per operation
/// kind and affect already-open sessions as well, mimicking a store
/// that degrades underneath a live connection.
pub struct MemoryBackend {
    counters: Arc<BackendCounters>,
    /// Countdown of `open_session` calls to fail before recovering.
    failing_opens: AtomicUsize,
    fail_allocation: Arc<AtomicBool>,
    fail_close: Arc<AtomicBool>,
}

impl MemoryBackend {
    /// Create a backend for the given store configuration.
    #[must_use]
    pub fn new(config: &StoreConfig) -> Self {
        tracing::info!(
            connect_string = %config.connect_string,
            database = %config.database,
            max_transactions = config.max_transactions,
            "memory store backend ready"
        );
        Self {
            counters: Arc::new(BackendCounters::default()),
            failing_opens: AtomicUsize::new(0),
            fail_allocation: Arc::new(AtomicBool::new(false)),
            fail_close: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared operation counters.
    #[must_use]
    pub fn counters(&self) -> Arc<BackendCounters> {
        Arc::clone(&self.counters)
    }

    /// Fail the next `n` `open_session` calls with
    /// [`InjectedFault::StoreUnreachable`].
    pub fn fail_next_opens(&self, n: usize) {
        self.failing_opens.store(n, Ordering::SeqCst);
    }

    /// Toggle [`InjectedFault::AllocationFailed`] on every session.
    pub fn set_allocation_fault(&self, on: bool) {
        self.fail_allocation.store(on, Ordering::SeqCst);
    }

    /// Toggle [`InjectedFault::CloseFailed`] on every session.
    pub fn set_close_fault(&self, on: bool) {
        self.fail_close.store(on, Ordering::SeqCst);
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(&StoreConfig::default())
    }
}

#[async_trait]
impl StoreBackend for MemoryBackend {
    async fn open_session(&self) -> Result<Box<dyn BackendSession>, StoreError> {
        let remaining = self
            .failing_opens
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if remaining {
            return Err(StoreError::Unavailable(
                InjectedFault::StoreUnreachable.to_string(),
            ));
        }

        self.counters.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession {
            counters: Arc::clone(&self.counters),
            fail_allocation: Arc::clone(&self.fail_allocation),
            fail_close: Arc::clone(&self.fail_close),
        }))
    }
}

struct MemorySession {
    counters: Arc<BackendCounters>,
    fail_allocation: Arc<AtomicBool>,
    fail_close: Arc<AtomicBool>,
}

#[async_trait]
impl BackendSession for MemorySession {
    fn new_instance(&mut self, dto: DtoType) -> Result<DtoValue, StoreError> {
        if self.fail_allocation.load(Ordering::SeqCst) {
            return Err(StoreError::Operation(
                InjectedFault::AllocationFailed.to_string(),
            ));
        }
        let seq = self.counters.instances_allocated.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockDto { dto, seq }))
    }

    async fn close(self: Box<Self>) -> Result<(), StoreError> {
        self.counters.sessions_closed.fetch_add(1, Ordering::SeqCst);
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(StoreError::SessionClose(
                InjectedFault::CloseFailed.to_string(),
            ));
        }
        Ok(())
    }
}
