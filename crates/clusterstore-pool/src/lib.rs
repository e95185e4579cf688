//! # clusterstore-pool
//!
//! Tiered session pool for a clustered data store, with a per-session
//! DTO cache warmed in the background.
//!
//! The pool circulates sessions through four lock-free queues:
//!
//! - **plain** — cache-disabled sessions,
//! - **ready** — cache-enabled sessions whose caches are populated,
//! - **preparing** — cache-enabled sessions awaiting warm-up,
//! - **pending-close** — sessions whose reuse budget is exhausted.
//!
//! Acquisition never blocks on cache population: callers get a ready
//! session when one exists, a partially-warmed one otherwise, and only
//! fall back to synchronous session creation when both pools are
//! empty. Two kinds of background task keep the supply topped up: a
//! refresh daemon that closes expended sessions and creates
//! replacements, and warm-up workers that fill session caches and
//! promote them to ready.
//!
//! Each session carries a reuse threshold drawn uniformly at random in
//! `[1, max_reuse_count]`, so recycling load spreads over time instead
//! of arriving in synchronized bursts.
//!
//! ## Example
//!
//! ```rust,ignore
//! use clusterstore_pool::{PoolConfig, SessionPool};
//!
//! let config = PoolConfig::new()
//!     .max_reuse_count(500)
//!     .initial_pool_size(10)
//!     .cache_enabled_sessions(100)
//!     .dto_capacity(DtoType::new("PendingEvent"), 8000);
//!
//! let pool = SessionPool::start(backend, config).await?;
//! pool.init_cacheable_sessions().await?;
//!
//! let session = pool.acquire_cache_enabled().await?;
//! // ... run transactions ...
//! pool.release(session, false, true);
//!
//! pool.stop().await;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod latency;
pub mod pool;
pub mod session;

mod refresh;
mod warmup;

// Configuration
pub use config::PoolConfig;

// Error types
pub use error::PoolError;

// Pool types
pub use pool::{PoolStats, SessionPool};
pub use session::PooledSession;

// Instrumentation
pub use latency::RollingLatency;

// Store boundary, re-exported for callers that only link the pool
pub use clusterstore_client::{
    BackendSession, DtoCache, DtoType, DtoValue, StoreBackend, StoreError, StoreSession,
};
