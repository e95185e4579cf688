//! Pool-level error types.

use thiserror::Error;

use clusterstore_client::StoreError;

/// Errors surfaced by the session pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// A store-layer failure, translated at the session boundary.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The pool configuration failed validation.
    #[error("invalid pool configuration: {0}")]
    InvalidConfig(String),

    /// The pool has been stopped; no further sessions are handed out.
    #[error("session pool is closed")]
    PoolClosed,
}

/// Convenience alias for pool results.
pub type Result<T> = std::result::Result<T, PoolError>;
