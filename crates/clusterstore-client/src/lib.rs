//! # clusterstore-client
//!
//! Store-facing session layer for the clusterstore session pool.
//!
//! This crate defines the boundary to the underlying clustered data
//! store (an opaque remote resource with its own latency and failure
//! modes) and the session wrapper the pool hands out:
//!
//! - [`StoreBackend`] / [`BackendSession`]: the minimal surface this
//!   system consumes from the store client — open a session, allocate
//!   DTO instances, close the session.
//! - [`StoreSession`]: a backend session plus an optional per-session
//!   [`DtoCache`], translating every backend failure into this
//!   system's own [`StoreError`] kinds so pool logic never depends on
//!   store-specific error types.
//! - [`DtoCache`]: a bounded, per-type cache of pre-allocated DTO
//!   instances that the pool's warm-up workers populate in the
//!   background.
//!
//! ## Example
//!
//! ```rust,ignore
//! use clusterstore_client::{DtoType, StoreSession};
//!
//! let mut session = StoreSession::new(backend.open_session().await?);
//! session.enable_cache();
//! session.register_type(DtoType::new("PendingEvent"), 8000)?;
//!
//! // Cache hit when warmed, backend allocation otherwise.
//! let dto = session.new_cached_instance(DtoType::new("PendingEvent"))?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod backend;
pub mod cache;
pub mod config;
pub mod dto;
pub mod error;
pub mod session;

// Re-export commonly used types
pub use backend::{BackendSession, StoreBackend};
pub use cache::DtoCache;
pub use config::StoreConfig;
pub use dto::{DtoType, DtoValue};
pub use error::StoreError;
pub use session::StoreSession;
