//! DTO type identifiers and opaque instance values.

use std::any::Any;
use std::fmt;

/// Identifier for a data-transfer-object type eligible for caching.
///
/// The pool does not know the concrete Rust types flowing through a
/// session's cache; it keys everything on this identifier. Capacities
/// are configured per [`DtoType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DtoType(&'static str);

impl DtoType {
    /// Create a type identifier from its stable name.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// The stable name of this DTO type.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for DtoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// An opaque, pre-allocated DTO instance.
///
/// Produced by [`BackendSession::new_instance`](crate::BackendSession::new_instance)
/// and parked in a session's [`DtoCache`](crate::DtoCache) until a
/// caller claims it. Callers downcast to the concrete type they
/// registered.
pub type DtoValue = Box<dyn Any + Send>;
