//! Pool configuration.

use std::time::Duration;

use clusterstore_client::DtoType;

use crate::error::PoolError;

/// Configuration for a [`SessionPool`](crate::SessionPool).
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use clusterstore_pool::PoolConfig;
///
/// let config = PoolConfig::new()
///     .max_reuse_count(500)
///     .initial_pool_size(10)
///     .cache_enabled_sessions(100)
///     .refresh_interval(Duration::from_millis(5));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Upper bound for the randomized per-session reuse threshold.
    ///
    /// Each session draws its own threshold uniformly from
    /// `[1, max_reuse_count]`. Must be greater than zero.
    pub max_reuse_count: u32,

    /// Number of cache-disabled sessions created at startup.
    pub initial_pool_size: usize,

    /// Number of cache-enabled sessions created by
    /// [`init_cacheable_sessions`](crate::SessionPool::init_cacheable_sessions):
    /// half fully warmed into the ready pool, half left preparing.
    pub cache_enabled_sessions: usize,

    /// Cache capacity per registered DTO type.
    pub dto_capacities: Vec<(DtoType, usize)>,

    /// Tick interval of the refresh daemon.
    pub refresh_interval: Duration,

    /// Number of concurrent cache warm-up workers.
    pub warmup_workers: usize,

    /// Sessions a warm-up worker drains from the preparing pool per
    /// wake-up cycle.
    pub warmup_batch: usize,

    /// Window size of the rolling creation/close latency tracker.
    pub latency_window: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_reuse_count: 500,
            initial_pool_size: 10,
            cache_enabled_sessions: 100,
            dto_capacities: Vec::new(),
            refresh_interval: Duration::from_millis(5),
            warmup_workers: 3,
            warmup_batch: 20,
            latency_window: 64,
        }
    }
}

impl PoolConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the reuse threshold upper bound.
    #[must_use]
    pub fn max_reuse_count(mut self, count: u32) -> Self {
        self.max_reuse_count = count;
        self
    }

    /// Set the initial cache-disabled pool size.
    #[must_use]
    pub fn initial_pool_size(mut self, size: usize) -> Self {
        self.initial_pool_size = size;
        self
    }

    /// Set the number of cache-enabled sessions.
    #[must_use]
    pub fn cache_enabled_sessions(mut self, count: usize) -> Self {
        self.cache_enabled_sessions = count;
        self
    }

    /// Register a DTO type with its cache capacity.
    #[must_use]
    pub fn dto_capacity(mut self, dto: DtoType, capacity: usize) -> Self {
        self.dto_capacities.push((dto, capacity));
        self
    }

    /// Set the refresh daemon tick interval.
    #[must_use]
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Set the warm-up worker count.
    #[must_use]
    pub fn warmup_workers(mut self, workers: usize) -> Self {
        self.warmup_workers = workers;
        self
    }

    /// Set the warm-up per-cycle batch size.
    #[must_use]
    pub fn warmup_batch(mut self, batch: usize) -> Self {
        self.warmup_batch = batch;
        self
    }

    /// Set the latency tracker window size.
    #[must_use]
    pub fn latency_window(mut self, window: usize) -> Self {
        self.latency_window = window;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidConfig`] when `max_reuse_count` is zero, a
    /// DTO capacity is zero, or a worker/window parameter would leave a
    /// daemon without work it can do.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.max_reuse_count == 0 {
            return Err(PoolError::InvalidConfig(
                "max_reuse_count must be greater than zero".to_string(),
            ));
        }
        if self.latency_window == 0 {
            return Err(PoolError::InvalidConfig(
                "latency_window must be greater than zero".to_string(),
            ));
        }
        if self.cache_enabled_sessions > 0 {
            if self.warmup_workers == 0 {
                return Err(PoolError::InvalidConfig(
                    "warmup_workers must be greater than zero when cache-enabled \
                     sessions are configured"
                        .to_string(),
                ));
            }
            if self.warmup_batch == 0 {
                return Err(PoolError::InvalidConfig(
                    "warmup_batch must be greater than zero when cache-enabled \
                     sessions are configured"
                        .to_string(),
                ));
            }
        }
        if let Some((dto, capacity)) = self
            .dto_capacities
            .iter()
            .find(|(_, capacity)| *capacity == 0)
        {
            return Err(PoolError::InvalidConfig(format!(
                "cache capacity for DTO type {dto} must be greater than zero (got {capacity})"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(PoolConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_reuse_count_rejected() {
        let config = PoolConfig::new().max_reuse_count(0);
        assert!(matches!(
            config.validate(),
            Err(PoolError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_dto_capacity_rejected() {
        let config = PoolConfig::new().dto_capacity(DtoType::new("PendingEvent"), 0);
        assert!(matches!(
            config.validate(),
            Err(PoolError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_workers_allowed_without_cacheable_sessions() {
        let config = PoolConfig::new().cache_enabled_sessions(0).warmup_workers(0);
        assert!(config.validate().is_ok());

        let config = PoolConfig::new().cache_enabled_sessions(4).warmup_workers(0);
        assert!(config.validate().is_err());
    }
}
