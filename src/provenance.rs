//! Resolution of a type's code-source location.
//!
//! The location is derived transitively: type -> protection domain -> code
//! source -> location string. Each step reads live object state in the
//! hosted runtime and may legitimately come back empty; absence at any step
//! is the defined terminal case, not an error.

use crate::types::{ObjectHandle, TypeId};

/// Typed access into the hosted runtime's live object state.
///
/// Every method is a field read against a live object and runs on the
/// calling thread's execution context. Implementations surface an
/// unresolvable field the same way as an absent value: `None`.
pub trait RuntimeAccess: Send + Sync {
    /// The protection domain associated with a type, if it has one.
    fn protection_domain(&self, type_id: TypeId) -> Option<ObjectHandle>;

    /// The code source declared by a protection domain, if any.
    fn code_source(&self, domain: ObjectHandle) -> Option<ObjectHandle>;

    /// The normalized, fragment-stripped location string of a code source.
    fn source_location(&self, code_source: ObjectHandle) -> Option<String>;
}

/// Resolve where a type's code originated.
///
/// Resolved fresh on every call; results are never cached here because the
/// runtime may redefine the underlying objects between calls.
pub fn resolve_code_source(runtime: &dyn RuntimeAccess, type_id: TypeId) -> Option<String> {
    let domain = runtime.protection_domain(type_id)?;
    let code_source = runtime.code_source(domain)?;
    runtime.source_location(code_source)
}
