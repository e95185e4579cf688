//! Backend traits: the surface consumed from the store client.
//!
//! The underlying clustered store is an external collaborator. This
//! module pins down the only operations the session layer needs from
//! it: open a session, allocate DTO instances on a session, and close
//! the session. Everything else the store offers (queries,
//! transactions, persistence) is out of this crate's scope.

use async_trait::async_trait;

use crate::dto::{DtoType, DtoValue};
use crate::error::StoreError;

/// Factory for store sessions.
///
/// Implementations wrap the real store's connection factory. The pool
/// holds one backend for its whole lifetime; `open_session` may be
/// called concurrently from caller threads and background daemons.
#[async_trait]
pub trait StoreBackend: Send + Sync + 'static {
    /// Open a new session against the store.
    ///
    /// # Errors
    ///
    /// [`StoreError::Unavailable`] when the store cannot be reached,
    /// [`StoreError::SessionCreation`] for per-session failures.
    async fn open_session(&self) -> Result<Box<dyn BackendSession>, StoreError>;
}

/// A live session handle against the store.
///
/// Exactly one owner at a time; ownership transfers through the pool's
/// queues, never by sharing.
#[async_trait]
pub trait BackendSession: Send + 'static {
    /// Allocate a fresh instance of the given DTO type.
    ///
    /// Used both for direct allocation on cache misses and by the
    /// warm-up workers to pre-populate session caches.
    fn new_instance(&mut self, dto: DtoType) -> Result<DtoValue, StoreError>;

    /// Close the session, releasing its store-side resources.
    async fn close(self: Box<Self>) -> Result<(), StoreError>;
}
