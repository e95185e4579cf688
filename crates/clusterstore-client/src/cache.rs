//! Per-session bounded DTO cache.

use std::collections::HashMap;
use std::fmt;

use crate::dto::{DtoType, DtoValue};
use crate::error::StoreError;

/// Bounded storage for one registered DTO type.
struct TypeSlot {
    capacity: usize,
    instances: Vec<DtoValue>,
}

/// Bounded, per-type cache of pre-allocated DTO instances.
///
/// Each cache belongs to exactly one session and is only ever touched
/// by whoever currently owns that session (a caller holding it checked
/// out, or the warm-up worker that dequeued it from the preparing
/// pool), so no internal locking is needed.
///
/// The stored count for any registered type never exceeds its
/// configured capacity; [`put`](DtoCache::put) on a full or
/// unregistered type reports `false` as an ordinary backpressure
/// signal rather than an error.
pub struct DtoCache {
    slots: HashMap<DtoType, TypeSlot>,
}

impl DtoCache {
    /// Create an empty cache with no registered types.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
        }
    }

    /// Declare a DTO type eligible for caching with a fixed capacity.
    ///
    /// Re-registering with the same capacity is a no-op. Re-registering
    /// with a different capacity adopts the new capacity and discards
    /// any instances beyond it.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidCacheConfig`] when `capacity` is zero.
    pub fn register_type(&mut self, dto: DtoType, capacity: usize) -> Result<(), StoreError> {
        if capacity == 0 {
            return Err(StoreError::InvalidCacheConfig { dto, capacity });
        }

        match self.slots.get_mut(&dto) {
            Some(slot) if slot.capacity == capacity => {}
            Some(slot) => {
                tracing::debug!(
                    dto = %dto,
                    old = slot.capacity,
                    new = capacity,
                    "re-registering DTO type with a different capacity"
                );
                slot.capacity = capacity;
                slot.instances.truncate(capacity);
            }
            None => {
                self.slots.insert(
                    dto,
                    TypeSlot {
                        capacity,
                        instances: Vec::with_capacity(capacity.min(64)),
                    },
                );
            }
        }
        Ok(())
    }

    /// Remove a type from the cache, discarding its stored instances.
    pub fn deregister_type(&mut self, dto: DtoType) {
        self.slots.remove(&dto);
    }

    /// Whether the given type is registered.
    #[must_use]
    pub fn contains_type(&self, dto: DtoType) -> bool {
        self.slots.contains_key(&dto)
    }

    /// Store an instance if the type is registered and under capacity.
    ///
    /// Returns whether the instance was stored; a rejected instance is
    /// dropped, mirroring what the allocator-side caller would do with
    /// it anyway.
    pub fn put(&mut self, dto: DtoType, value: DtoValue) -> bool {
        match self.slots.get_mut(&dto) {
            Some(slot) if slot.instances.len() < slot.capacity => {
                slot.instances.push(value);
                true
            }
            _ => false,
        }
    }

    /// Remove and return one stored instance of the given type.
    pub fn get(&mut self, dto: DtoType) -> Option<DtoValue> {
        self.slots.get_mut(&dto)?.instances.pop()
    }

    /// Number of instances currently stored for the given type.
    #[must_use]
    pub fn stored(&self, dto: DtoType) -> usize {
        self.slots.get(&dto).map_or(0, |slot| slot.instances.len())
    }

    /// Configured capacity for the given type, if registered.
    #[must_use]
    pub fn capacity(&self, dto: DtoType) -> Option<usize> {
        self.slots.get(&dto).map(|slot| slot.capacity)
    }

    /// Registered types whose stored count is below capacity.
    ///
    /// Consumed by the warm-up worker to decide what to populate.
    #[must_use]
    pub fn not_full_types(&self) -> Vec<DtoType> {
        self.slots
            .iter()
            .filter(|(_, slot)| slot.instances.len() < slot.capacity)
            .map(|(dto, _)| *dto)
            .collect()
    }

    /// Whether every registered type is filled to capacity.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.slots
            .values()
            .all(|slot| slot.instances.len() >= slot.capacity)
    }
}

impl Default for DtoCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DtoCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (dto, slot) in &self.slots {
            map.entry(
                dto,
                &format_args!("{}/{}", slot.instances.len(), slot.capacity),
            );
        }
        map.finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const EVENT: DtoType = DtoType::new("PendingEvent");
    const HEARTBEAT: DtoType = DtoType::new("NodeHeartbeat");

    fn boxed(n: u32) -> DtoValue {
        Box::new(n)
    }

    #[test]
    fn test_register_rejects_zero_capacity() {
        let mut cache = DtoCache::new();
        assert!(matches!(
            cache.register_type(EVENT, 0),
            Err(StoreError::InvalidCacheConfig { capacity: 0, .. })
        ));
        assert!(!cache.contains_type(EVENT));
    }

    #[test]
    fn test_register_idempotent_same_capacity() {
        let mut cache = DtoCache::new();
        cache.register_type(EVENT, 2).unwrap();
        assert!(cache.put(EVENT, boxed(1)));
        cache.register_type(EVENT, 2).unwrap();
        assert_eq!(cache.stored(EVENT), 1);
    }

    #[test]
    fn test_reregister_smaller_capacity_truncates() {
        let mut cache = DtoCache::new();
        cache.register_type(EVENT, 3).unwrap();
        for i in 0..3 {
            assert!(cache.put(EVENT, boxed(i)));
        }
        cache.register_type(EVENT, 1).unwrap();
        assert_eq!(cache.stored(EVENT), 1);
        assert!(!cache.put(EVENT, boxed(9)));
    }

    #[test]
    fn test_capacity_two_scenario() {
        let mut cache = DtoCache::new();
        cache.register_type(EVENT, 2).unwrap();

        assert!(cache.put(EVENT, boxed(1)));
        assert!(cache.put(EVENT, boxed(2)));
        assert!(!cache.put(EVENT, boxed(3)));

        let got = *cache.get(EVENT).unwrap().downcast::<u32>().unwrap();
        assert!(got == 1 || got == 2);

        assert!(cache.put(EVENT, boxed(3)));
        assert_eq!(cache.stored(EVENT), 2);
    }

    #[test]
    fn test_put_unregistered_is_backpressure_not_error() {
        let mut cache = DtoCache::new();
        assert!(!cache.put(EVENT, boxed(1)));
    }

    #[test]
    fn test_get_unregistered_and_empty() {
        let mut cache = DtoCache::new();
        assert!(cache.get(EVENT).is_none());
        cache.register_type(EVENT, 1).unwrap();
        assert!(cache.get(EVENT).is_none());
    }

    #[test]
    fn test_not_full_types_exactness() {
        let mut cache = DtoCache::new();
        cache.register_type(EVENT, 1).unwrap();
        cache.register_type(HEARTBEAT, 2).unwrap();

        let mut not_full = cache.not_full_types();
        not_full.sort();
        assert_eq!(not_full, vec![HEARTBEAT, EVENT]);

        assert!(cache.put(EVENT, boxed(1)));
        assert_eq!(cache.not_full_types(), vec![HEARTBEAT]);

        assert!(cache.put(HEARTBEAT, boxed(2)));
        assert!(cache.put(HEARTBEAT, boxed(3)));
        assert!(cache.not_full_types().is_empty());
        assert!(cache.is_full());
    }

    #[test]
    fn test_deregister_discards_instances() {
        let mut cache = DtoCache::new();
        cache.register_type(EVENT, 2).unwrap();
        assert!(cache.put(EVENT, boxed(1)));
        cache.deregister_type(EVENT);
        assert!(!cache.contains_type(EVENT));
        assert!(cache.get(EVENT).is_none());
    }

    proptest::proptest! {
        /// The stored count never exceeds capacity for any put/get
        /// interleaving, and put reports exactly whether it stored.
        #[test]
        fn prop_capacity_never_exceeded(
            capacity in 1usize..16,
            ops in proptest::collection::vec(proptest::bool::ANY, 0..256),
        ) {
            let mut cache = DtoCache::new();
            cache.register_type(EVENT, capacity).unwrap();
            let mut expected = 0usize;

            for (i, is_put) in ops.into_iter().enumerate() {
                if is_put {
                    let stored = cache.put(EVENT, Box::new(i));
                    proptest::prop_assert_eq!(stored, expected < capacity);
                    if stored {
                        expected += 1;
                    }
                } else if cache.get(EVENT).is_some() {
                    expected -= 1;
                }
                proptest::prop_assert_eq!(cache.stored(EVENT), expected);
                proptest::prop_assert!(expected <= capacity);
            }
        }
    }
}
