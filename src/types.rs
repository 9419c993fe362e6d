use serde::Serialize;
use std::fmt::{self, Display, Formatter};

/// Identity of a type descriptor in the hosted runtime.
///
/// The runtime owns type metadata; this crate only ever carries the identity
/// around and hands it back through [`crate::provenance::RuntimeAccess`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TypeId(pub u64);

impl TypeId {
    pub fn new(raw: u64) -> Self {
        TypeId(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl Display for TypeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TypeId {
    fn from(raw: u64) -> Self {
        TypeId(raw)
    }
}

/// Opaque handle to a live object on the hosted runtime's heap.
///
/// Only valid for the duration of the call that produced it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectHandle(pub u64);

impl ObjectHandle {
    pub fn new(raw: u64) -> Self {
        ObjectHandle(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}
