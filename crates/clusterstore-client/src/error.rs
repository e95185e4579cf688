//! Store-boundary error types.
//!
//! Backend failures are translated into these kinds at the session
//! wrapper so nothing above this crate depends on store-specific
//! error types.

use thiserror::Error;

use crate::dto::DtoType;

/// Errors surfaced by the store session layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store factory/connection cannot be established.
    ///
    /// Fatal at startup, recoverable nowhere else.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A session could not be created.
    #[error("session creation failed: {0}")]
    SessionCreation(String),

    /// A session could not be closed.
    #[error("session close failed: {0}")]
    SessionClose(String),

    /// Any other store-side failure during a session operation, such
    /// as a DTO allocation.
    #[error("store operation failed: {0}")]
    Operation(String),

    /// A cache operation was invoked on a session without a cache.
    ///
    /// Programming error on the caller's side, not a store failure.
    #[error("DTO cache is disabled for this session")]
    CacheDisabled,

    /// A DTO type was registered with an unusable capacity.
    #[error("invalid cache capacity {capacity} for DTO type {dto}")]
    InvalidCacheConfig {
        /// The type being registered.
        dto: DtoType,
        /// The rejected capacity.
        capacity: usize,
    },
}

impl StoreError {
    /// Whether this error is fatal for pool initialization.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Convenience alias for store-layer results.
pub type Result<T> = std::result::Result<T, StoreError>;
