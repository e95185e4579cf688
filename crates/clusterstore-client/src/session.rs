//! Session wrapper pairing a backend session with an optional DTO cache.

use crate::backend::BackendSession;
use crate::cache::DtoCache;
use crate::dto::{DtoType, DtoValue};
use crate::error::{Result, StoreError};

/// A live store session, optionally carrying a [`DtoCache`].
///
/// This is the unit the pool circulates: a session with an empty or
/// partially-populated cache is fully functional, just slower on its
/// first few allocations, so warm-up is strictly an optimization.
pub struct StoreSession {
    inner: Box<dyn BackendSession>,
    cache: Option<DtoCache>,
}

impl StoreSession {
    /// Wrap a freshly opened backend session. No cache is attached.
    #[must_use]
    pub fn new(inner: Box<dyn BackendSession>) -> Self {
        Self { inner, cache: None }
    }

    /// Attach an empty DTO cache to this session.
    pub fn enable_cache(&mut self) {
        self.cache = Some(DtoCache::new());
    }

    /// Whether this session carries a DTO cache.
    #[must_use]
    pub fn is_cache_enabled(&self) -> bool {
        self.cache.is_some()
    }

    fn cache_mut(&mut self) -> Result<&mut DtoCache> {
        self.cache.as_mut().ok_or(StoreError::CacheDisabled)
    }

    fn cache(&self) -> Result<&DtoCache> {
        self.cache.as_ref().ok_or(StoreError::CacheDisabled)
    }

    /// Register a DTO type on this session's cache.
    ///
    /// # Errors
    ///
    /// [`StoreError::CacheDisabled`] when no cache is attached,
    /// [`StoreError::InvalidCacheConfig`] for a zero capacity.
    pub fn register_type(&mut self, dto: DtoType, capacity: usize) -> Result<()> {
        self.cache_mut()?.register_type(dto, capacity)
    }

    /// Deregister a DTO type, discarding its cached instances.
    ///
    /// # Errors
    ///
    /// [`StoreError::CacheDisabled`] when no cache is attached.
    pub fn deregister_type(&mut self, dto: DtoType) -> Result<()> {
        self.cache_mut()?.deregister_type(dto);
        Ok(())
    }

    /// Store an instance into this session's cache.
    ///
    /// # Errors
    ///
    /// [`StoreError::CacheDisabled`] when no cache is attached.
    pub fn put_to_cache(&mut self, dto: DtoType, value: DtoValue) -> Result<bool> {
        Ok(self.cache_mut()?.put(dto, value))
    }

    /// Registered types whose cache is below capacity.
    ///
    /// # Errors
    ///
    /// [`StoreError::CacheDisabled`] when no cache is attached.
    pub fn not_full_types(&self) -> Result<Vec<DtoType>> {
        Ok(self.cache()?.not_full_types())
    }

    /// Whether the cache is populated to capacity for every type.
    ///
    /// A session without a cache counts as full: there is nothing to
    /// warm.
    #[must_use]
    pub fn is_cache_full(&self) -> bool {
        self.cache.as_ref().is_none_or(DtoCache::is_full)
    }

    /// Obtain an instance, preferring the cache.
    ///
    /// Falls through to a backend allocation when the type is not
    /// registered or the cache is empty, mirroring the cache-miss path
    /// a cache-disabled session always takes.
    pub fn new_cached_instance(&mut self, dto: DtoType) -> Result<DtoValue> {
        if let Some(cache) = self.cache.as_mut() {
            if let Some(value) = cache.get(dto) {
                return Ok(value);
            }
        }
        self.inner.new_instance(dto)
    }

    /// Allocate a fresh instance directly from the backend.
    pub fn new_instance(&mut self, dto: DtoType) -> Result<DtoValue> {
        self.inner.new_instance(dto)
    }

    /// Fill every not-full registered type to capacity.
    ///
    /// Returns the number of instances created. Used by the pool's
    /// warm-up workers; a failure leaves the cache partially populated
    /// but consistent.
    pub fn warm_cache(&mut self) -> Result<usize> {
        let Some(cache) = self.cache.as_mut() else {
            return Err(StoreError::CacheDisabled);
        };

        let mut created = 0;
        for dto in cache.not_full_types() {
            let deficit = cache
                .capacity(dto)
                .unwrap_or(0)
                .saturating_sub(cache.stored(dto));
            for _ in 0..deficit {
                let value = self.inner.new_instance(dto)?;
                if !cache.put(dto, value) {
                    break;
                }
                created += 1;
            }
        }
        Ok(created)
    }

    /// Close the backend session, dropping any cached instances.
    pub async fn close(self) -> Result<()> {
        self.inner.close().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const EVENT: DtoType = DtoType::new("PendingEvent");

    /// Counts allocations; instances are just sequence numbers.
    struct CountingSession {
        allocated: Arc<AtomicUsize>,
        closed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl BackendSession for CountingSession {
        fn new_instance(&mut self, _dto: DtoType) -> Result<DtoValue> {
            let n = self.allocated.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(n))
        }

        async fn close(self: Box<Self>) -> Result<()> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn counting_session() -> (StoreSession, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let allocated = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicUsize::new(0));
        let session = StoreSession::new(Box::new(CountingSession {
            allocated: Arc::clone(&allocated),
            closed: Arc::clone(&closed),
        }));
        (session, allocated, closed)
    }

    #[test]
    fn test_cache_disabled_operations_fail() {
        let (mut session, _, _) = counting_session();
        assert!(!session.is_cache_enabled());
        assert!(matches!(
            session.register_type(EVENT, 10),
            Err(StoreError::CacheDisabled)
        ));
        assert!(matches!(
            session.put_to_cache(EVENT, Box::new(0u32)),
            Err(StoreError::CacheDisabled)
        ));
        assert!(matches!(
            session.warm_cache(),
            Err(StoreError::CacheDisabled)
        ));
    }

    #[test]
    fn test_cache_disabled_session_still_allocates() {
        let (mut session, allocated, _) = counting_session();
        session.new_cached_instance(EVENT).unwrap();
        session.new_cached_instance(EVENT).unwrap();
        assert_eq!(allocated.load(Ordering::SeqCst), 2);
        // No cache means every session counts as warmed.
        assert!(session.is_cache_full());
    }

    #[test]
    fn test_warm_cache_fills_to_capacity() {
        let (mut session, allocated, _) = counting_session();
        session.enable_cache();
        session.register_type(EVENT, 5).unwrap();
        assert!(!session.is_cache_full());

        assert_eq!(session.warm_cache().unwrap(), 5);
        assert_eq!(allocated.load(Ordering::SeqCst), 5);
        assert!(session.is_cache_full());
        assert!(session.not_full_types().unwrap().is_empty());

        // Warming a full cache is a no-op.
        assert_eq!(session.warm_cache().unwrap(), 0);
        assert_eq!(allocated.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_cached_instance_prefers_cache() {
        let (mut session, allocated, _) = counting_session();
        session.enable_cache();
        session.register_type(EVENT, 2).unwrap();
        session.warm_cache().unwrap();
        assert_eq!(allocated.load(Ordering::SeqCst), 2);

        // Two hits drain the cache, the third falls through.
        session.new_cached_instance(EVENT).unwrap();
        session.new_cached_instance(EVENT).unwrap();
        assert_eq!(allocated.load(Ordering::SeqCst), 2);
        session.new_cached_instance(EVENT).unwrap();
        assert_eq!(allocated.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_close_reaches_backend() {
        let (session, _, closed) = counting_session();
        session.close().await.unwrap();
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }
}
