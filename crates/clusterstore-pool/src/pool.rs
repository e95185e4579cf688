//! Tiered session pool implementation.
//!
//! The pool owns four lock-free queues and is the only component that
//! moves sessions between them; a session is a member of at most one
//! queue (or checked out by exactly one caller) at any time. Acquire
//! and release never suspend except on the synchronous-creation
//! fallback, which is bounded only by the store's session-open latency.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crossbeam_queue::SegQueue;
use parking_lot::Mutex;
use rand::Rng;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use clusterstore_client::{StoreBackend, StoreSession};

use crate::config::PoolConfig;
use crate::error::{PoolError, Result};
use crate::latency::RollingLatency;
use crate::session::PooledSession;
use crate::{refresh, warmup};

/// Session pool for a clustered data store.
///
/// Hands out ready cache-enabled sessions without blocking on cache
/// population, recycles sessions after a randomized number of uses,
/// and keeps a supply of pre-warmed sessions topped up through
/// background daemons.
///
/// # Example
///
/// ```rust,ignore
/// let pool = SessionPool::start(backend, config).await?;
/// pool.init_cacheable_sessions().await?;
///
/// let session = pool.acquire_cache_enabled().await?;
/// // ... run transactions through the session ...
/// pool.release(session, false, true);
/// ```
pub struct SessionPool {
    inner: Arc<PoolInner>,
    /// Background task handles, joined on `stop()`.
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for SessionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPool").finish_non_exhaustive()
    }
}

/// Shared state between the pool facade and its background daemons.
pub(crate) struct PoolInner {
    pub(crate) backend: Arc<dyn StoreBackend>,
    pub(crate) config: PoolConfig,

    /// Cache-disabled sessions.
    pub(crate) plain: SegQueue<PooledSession>,
    /// Cache-enabled sessions with fully populated caches.
    pub(crate) ready: SegQueue<PooledSession>,
    /// Cache-enabled sessions awaiting warm-up.
    pub(crate) preparing: SegQueue<PooledSession>,
    /// Sessions whose reuse budget is exhausted.
    pub(crate) pending_close: SegQueue<PooledSession>,

    /// Monotonic count of sessions ever created.
    pub(crate) sessions_created: AtomicU64,
    /// Rolling creation/close latency.
    pub(crate) latency: RollingLatency,

    /// Raised by `release()` when a cache-enabled session re-enters
    /// the preparing pool. Wake-ups coalesce; a spurious one just
    /// finds the preparing pool empty and goes back to waiting.
    pub(crate) warmup_wake: Notify,
    /// Level-triggered shutdown signal for the daemons.
    pub(crate) shutdown: CancellationToken,
}

impl PoolInner {
    /// Open, wrap, and meter a new session.
    pub(crate) async fn create_session(&self, cache_enabled: bool) -> Result<PooledSession> {
        let start = Instant::now();
        let handle = self.backend.open_session().await?;
        let mut session = StoreSession::new(handle);

        if cache_enabled {
            session.enable_cache();
            for (dto, capacity) in &self.config.dto_capacities {
                session.register_type(*dto, *capacity)?;
            }
        }
        self.latency.record(start.elapsed());

        let max_reuse = rand::thread_rng().gen_range(1..=self.config.max_reuse_count);
        self.sessions_created.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(cache_enabled, max_reuse, "created session");
        Ok(PooledSession::new(session, max_reuse))
    }

    /// Close a session, recording the close latency.
    pub(crate) async fn close_session(&self, session: PooledSession) -> Result<()> {
        let start = Instant::now();
        let result = session.into_session().close().await;
        self.latency.record(start.elapsed());
        result.map_err(Into::into)
    }
}

impl SessionPool {
    /// Start the pool: validate the configuration, pre-create the
    /// cache-disabled pool, and launch the refresh daemon.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidConfig`] for a bad configuration;
    /// [`PoolError::Store`] when the store is unavailable or a
    /// session cannot be created — fatal, the pool does not start.
    pub async fn start(backend: Arc<dyn StoreBackend>, config: PoolConfig) -> Result<Self> {
        config.validate()?;

        let inner = Arc::new(PoolInner {
            backend,
            latency: RollingLatency::new(config.latency_window),
            config,
            plain: SegQueue::new(),
            ready: SegQueue::new(),
            preparing: SegQueue::new(),
            pending_close: SegQueue::new(),
            sessions_created: AtomicU64::new(0),
            warmup_wake: Notify::new(),
            shutdown: CancellationToken::new(),
        });

        for _ in 0..inner.config.initial_pool_size {
            let session = inner.create_session(false).await?;
            inner.plain.push(session);
        }

        tracing::info!(
            initial_pool_size = inner.config.initial_pool_size,
            max_reuse_count = inner.config.max_reuse_count,
            "session pool started"
        );

        let refresh_task = tokio::spawn(refresh::run(Arc::clone(&inner)));
        Ok(Self {
            inner,
            tasks: Mutex::new(vec![refresh_task]),
        })
    }

    /// Create the configured cache-enabled sessions and launch the
    /// warm-up workers.
    ///
    /// Half the sessions are fully warmed into the ready pool, half
    /// are left in the preparing pool for the workers to pick up, so
    /// startup cost is split between this call and the background.
    ///
    /// # Errors
    ///
    /// [`PoolError::Store`] when a session cannot be created or a
    /// cache cannot be populated.
    pub async fn init_cacheable_sessions(&self) -> Result<()> {
        let count = self.inner.config.cache_enabled_sessions;

        for _ in 0..count / 2 {
            let mut session = self.inner.create_session(true).await?;
            session.warm_cache()?;
            self.inner.ready.push(session);
        }
        for _ in 0..count / 2 {
            let session = self.inner.create_session(true).await?;
            self.inner.preparing.push(session);
        }

        if count > 0 {
            let mut tasks = self.tasks.lock();
            for worker in 0..self.inner.config.warmup_workers {
                tasks.push(tokio::spawn(warmup::run(Arc::clone(&self.inner), worker)));
            }
            // Kick the workers once so the preparing half warms
            // without waiting for the first release.
            self.inner.warmup_wake.notify_one();
        }

        tracing::info!(
            cache_enabled_sessions = count,
            warmup_workers = self.inner.config.warmup_workers,
            "cache-enabled session pools initialized"
        );
        Ok(())
    }

    /// Acquire a cache-enabled session.
    ///
    /// Prefers a fully warmed session, falls back to a
    /// partially-warmed one (an accepted latency/throughput tradeoff),
    /// and only creates a session synchronously when both pools are
    /// empty.
    ///
    /// # Errors
    ///
    /// [`PoolError::PoolClosed`] after `stop()`; [`PoolError::Store`]
    /// when the synchronous-creation fallback fails.
    pub async fn acquire_cache_enabled(&self) -> Result<PooledSession> {
        if self.inner.shutdown.is_cancelled() {
            return Err(PoolError::PoolClosed);
        }
        if let Some(session) = self.inner.ready.pop() {
            return Ok(session);
        }
        if let Some(session) = self.inner.preparing.pop() {
            tracing::debug!("no ready session available, handing out a preparing one");
            return Ok(session);
        }
        tracing::debug!("no ready or preparing sessions, creating one synchronously");
        self.inner.create_session(true).await
    }

    /// Acquire a cache-disabled session.
    ///
    /// # Errors
    ///
    /// [`PoolError::PoolClosed`] after `stop()`; [`PoolError::Store`]
    /// when the synchronous-creation fallback fails.
    pub async fn acquire_plain(&self) -> Result<PooledSession> {
        if self.inner.shutdown.is_cancelled() {
            return Err(PoolError::PoolClosed);
        }
        if let Some(session) = self.inner.plain.pop() {
            return Ok(session);
        }
        tracing::debug!("no cache-disabled session available, creating one synchronously");
        self.inner.create_session(false).await
    }

    /// Return a session to the pool.
    ///
    /// Increments the session's use count, then routes it: an expended
    /// or force-closed session goes to pending-close for the refresh
    /// daemon to recycle; otherwise it re-enters the preparing pool
    /// (cache-enabled, waking a warm-up worker) or the plain pool.
    /// `cache_enabled` mirrors which acquire handed the session out.
    ///
    /// Never suspends.
    pub fn release(&self, mut session: PooledSession, force_close: bool, cache_enabled: bool) {
        session.mark_used();

        if session.is_expended() || force_close {
            // A session can be retired before its budget expires, e.g.
            // after a store error left it in a doubtful state.
            self.inner.pending_close.push(session);
        } else if cache_enabled {
            self.inner.preparing.push(session);
            self.inner.warmup_wake.notify_one();
        } else {
            self.inner.plain.push(session);
        }
    }

    /// Stop the pool: cancel the daemons, then drain and close every
    /// queued session.
    ///
    /// Close failures are logged, never propagated — shutdown is
    /// best-effort. Sessions still checked out are not waited for;
    /// releasing one afterwards parks it in a queue nothing will
    /// drain. The drain loops until a full round over all four queues
    /// finds them empty, so a racing `release()` cannot strand a
    /// session mid-drain.
    pub async fn stop(&self) {
        self.inner.shutdown.cancel();

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(error) = task.await {
                tracing::warn!(%error, "background task ended abnormally");
            }
        }

        let mut closed = 0usize;
        loop {
            let mut drained_any = false;
            for queue in [
                &self.inner.plain,
                &self.inner.ready,
                &self.inner.preparing,
                &self.inner.pending_close,
            ] {
                while let Some(session) = queue.pop() {
                    drained_any = true;
                    if let Err(error) = self.inner.close_session(session).await {
                        tracing::warn!(%error, "failed to close session during pool drain");
                    }
                    closed += 1;
                }
            }
            if !drained_any {
                break;
            }
        }

        tracing::info!(closed, "session pool stopped");
    }

    /// Whether `stop()` has been called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Snapshot of the pool's counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            sessions_created: self.inner.sessions_created.load(Ordering::Relaxed),
            ready_sessions: self.inner.ready.len(),
            preparing_sessions: self.inner.preparing.len(),
            avg_session_op_ms: self.inner.latency.average_ms(),
        }
    }

    /// The pool configuration.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }
}

/// Point-in-time pool counters.
///
/// The latency figure is the rolling average over the last
/// `latency_window` session create/close operations; it is an
/// approximate diagnostic, not a correctness-critical value.
#[derive(Debug, Clone, Copy)]
pub struct PoolStats {
    /// Sessions created since the pool started (monotonic).
    pub sessions_created: u64,
    /// Current depth of the ready pool.
    pub ready_sessions: usize,
    /// Current depth of the preparing pool.
    pub preparing_sessions: usize,
    /// Rolling average session create/close latency in milliseconds.
    pub avg_session_op_ms: f64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    use clusterstore_client::{BackendSession, DtoType, DtoValue, StoreError};

    const EVENT: DtoType = DtoType::new("PendingEvent");

    #[derive(Default)]
    struct StubBackend {
        opened: AtomicUsize,
        closed: Arc<AtomicUsize>,
    }

    struct StubSession {
        closed: Arc<AtomicUsize>,
        next: usize,
    }

    #[async_trait]
    impl StoreBackend for StubBackend {
        async fn open_session(&self) -> std::result::Result<Box<dyn BackendSession>, StoreError> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(StubSession {
                closed: Arc::clone(&self.closed),
                next: 0,
            }))
        }
    }

    #[async_trait]
    impl BackendSession for StubSession {
        fn new_instance(&mut self, _dto: DtoType) -> std::result::Result<DtoValue, StoreError> {
            self.next += 1;
            Ok(Box::new(self.next))
        }

        async fn close(self: Box<Self>) -> std::result::Result<(), StoreError> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn quiet_config() -> PoolConfig {
        // Long tick so the refresh daemon stays out of the way unless
        // a test wants it.
        PoolConfig::new()
            .initial_pool_size(2)
            .cache_enabled_sessions(0)
            .refresh_interval(std::time::Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn test_start_populates_plain_pool() {
        let backend = Arc::new(StubBackend::default());
        let pool = SessionPool::start(Arc::clone(&backend) as Arc<dyn StoreBackend>, quiet_config())
            .await
            .unwrap();

        let stats = pool.stats();
        assert_eq!(stats.sessions_created, 2);
        assert_eq!(backend.opened.load(Ordering::SeqCst), 2);
        assert_eq!(stats.ready_sessions, 0);
        pool.stop().await;
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_config() {
        let backend = Arc::new(StubBackend::default());
        let result = SessionPool::start(backend, quiet_config().max_reuse_count(0)).await;
        assert!(matches!(result, Err(PoolError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_acquire_on_empty_pools_creates_cache_enabled() {
        let backend = Arc::new(StubBackend::default());
        let config = quiet_config()
            .initial_pool_size(0)
            .dto_capacity(EVENT, 4);
        let pool = SessionPool::start(backend, config).await.unwrap();

        let session = pool.acquire_cache_enabled().await.unwrap();
        assert_eq!(session.use_count(), 0);
        assert!(session.is_cache_enabled());
        // Registered but unwarmed.
        assert_eq!(session.not_full_types().unwrap(), vec![EVENT]);
        pool.release(session, false, true);
        pool.stop().await;
    }

    #[tokio::test]
    async fn test_max_reuse_within_configured_bound() {
        let backend = Arc::new(StubBackend::default());
        let config = quiet_config().initial_pool_size(0).max_reuse_count(10);
        let pool = SessionPool::start(backend, config).await.unwrap();

        for _ in 0..64 {
            let session = pool.acquire_plain().await.unwrap();
            assert!((1..=10).contains(&session.max_reuse()));
            pool.release(session, true, false);
        }
        pool.stop().await;
    }

    #[tokio::test]
    async fn test_release_routing_is_deterministic() {
        let backend = Arc::new(StubBackend::default());
        let config = quiet_config().initial_pool_size(1).max_reuse_count(1);
        let pool = SessionPool::start(backend, config).await.unwrap();

        // max_reuse_count == 1 forces max_reuse == 1: one use expends
        // the session.
        let session = pool.acquire_plain().await.unwrap();
        pool.release(session, false, false);
        assert_eq!(pool.inner.pending_close.len(), 1);
        assert_eq!(pool.inner.plain.len(), 0);
        pool.stop().await;
    }

    #[tokio::test]
    async fn test_release_cache_enabled_reenters_preparing() {
        let backend = Arc::new(StubBackend::default());
        let config = quiet_config().initial_pool_size(0).max_reuse_count(1000);
        let pool = SessionPool::start(backend, config).await.unwrap();

        let session = pool.acquire_cache_enabled().await.unwrap();
        pool.release(session, false, true);
        assert_eq!(pool.stats().preparing_sessions, 1);

        // Same session, forced closure overrides the remaining budget.
        let session = pool.acquire_cache_enabled().await.unwrap();
        assert_eq!(session.use_count(), 1);
        pool.release(session, true, true);
        assert_eq!(pool.stats().preparing_sessions, 0);
        assert_eq!(pool.inner.pending_close.len(), 1);
        pool.stop().await;
    }

    #[tokio::test]
    async fn test_stop_drains_queued_sessions_only() {
        let backend = Arc::new(StubBackend::default());
        let closed = Arc::clone(&backend.closed);
        let config = quiet_config().initial_pool_size(3).max_reuse_count(1000);
        let pool = SessionPool::start(backend, config).await.unwrap();

        // Five checked out on top of the three queued.
        let mut held = Vec::new();
        for _ in 0..5 {
            held.push(pool.acquire_plain().await.unwrap());
        }
        for _ in 0..3 {
            let session = pool.acquire_plain().await.unwrap();
            pool.release(session, false, false);
        }

        pool.stop().await;
        assert_eq!(closed.load(Ordering::SeqCst), 3);
        assert!(pool.is_stopped());

        // Checked-out sessions are untouched; acquiring anew fails.
        assert!(matches!(
            pool.acquire_plain().await,
            Err(PoolError::PoolClosed)
        ));
        drop(held);
    }

    #[tokio::test]
    async fn test_refresh_daemon_replaces_expended_sessions() {
        let backend = Arc::new(StubBackend::default());
        let closed = Arc::clone(&backend.closed);
        let config = quiet_config()
            .initial_pool_size(1)
            .max_reuse_count(1)
            .refresh_interval(std::time::Duration::from_millis(5));
        let pool = SessionPool::start(backend, config).await.unwrap();

        let session = pool.acquire_plain().await.unwrap();
        pool.release(session, false, false);

        // Wait for a daemon tick to close the session and enqueue a
        // cache-enabled replacement into preparing.
        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while pool.stats().preparing_sessions == 0 {
                tokio::time::sleep(std::time::Duration::from_millis(2)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(closed.load(Ordering::SeqCst), 1);
        assert_eq!(pool.stats().preparing_sessions, 1);
        pool.stop().await;
    }
}
