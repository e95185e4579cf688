//! Pooled session handle with reuse accounting.

use std::fmt;
use std::ops::{Deref, DerefMut};

use clusterstore_client::StoreSession;

/// A store session owned by the pool, paired with its reuse budget.
///
/// `use_count` is only ever advanced by the pool while the caller that
/// held the session returns it, so it needs no synchronization: mutual
/// exclusion is structural, enforced by ownership transfer through the
/// pool's queues. Once the count reaches the randomized `max_reuse`
/// threshold the session routes to pending-close and is never handed
/// out again.
pub struct PooledSession {
    session: StoreSession,
    use_count: u32,
    max_reuse: u32,
}

impl PooledSession {
    /// Wrap a session with a reuse threshold drawn by the pool.
    #[must_use]
    pub(crate) fn new(session: StoreSession, max_reuse: u32) -> Self {
        Self {
            session,
            use_count: 0,
            max_reuse,
        }
    }

    /// Check-out/return cycles this session has completed.
    #[must_use]
    pub fn use_count(&self) -> u32 {
        self.use_count
    }

    /// Randomized reuse threshold fixed at creation.
    #[must_use]
    pub fn max_reuse(&self) -> u32 {
        self.max_reuse
    }

    /// Record one completed use cycle.
    pub(crate) fn mark_used(&mut self) {
        self.use_count += 1;
    }

    /// Whether the reuse budget is exhausted.
    #[must_use]
    pub fn is_expended(&self) -> bool {
        self.use_count >= self.max_reuse
    }

    /// Unwrap the underlying store session, e.g. to close it.
    #[must_use]
    pub(crate) fn into_session(self) -> StoreSession {
        self.session
    }
}

impl Deref for PooledSession {
    type Target = StoreSession;

    fn deref(&self) -> &StoreSession {
        &self.session
    }
}

impl DerefMut for PooledSession {
    fn deref_mut(&mut self) -> &mut StoreSession {
        &mut self.session
    }
}

impl fmt::Debug for PooledSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledSession")
            .field("use_count", &self.use_count)
            .field("max_reuse", &self.max_reuse)
            .field("cache_enabled", &self.session.is_cache_enabled())
            .finish_non_exhaustive()
    }
}
