//! # finalizer-events
//!
//! Finalization-lifecycle diagnostics for a managed runtime. Types that
//! override the legacy finalization hook are tracked through three stages:
//! registration (an instance became finalizable), enqueueing (it became
//! unreachable and was queued), and finalization (the hook ran). This crate
//! turns that live, concurrently-updated tracking state into point-in-time
//! diagnostic events.
//!
//! ## Subsystems
//!
//! - **Tracking table** (`table`): per-type lifecycle counters behind the
//!   structural lock that keeps traversals coherent.
//! - **Provenance** (`provenance`): resolution of a type's code-source
//!   location through the hosted runtime's capability interface.
//! - **Events** (`event`): the emitted record, the location interner, and
//!   the sink boundary to the transport layer.
//! - **Emitter** (`emitter`): the two entry points, one terminal event on
//!   type unload and one event per tracked type on a sweep pass.
//! - **Periodic task** (`periodic`): the background thread driving sweeps
//!   on a fixed interval.

pub mod emitter;
pub mod error;
pub mod event;
pub mod periodic;
pub mod provenance;
pub mod table;
pub mod types;

pub use emitter::FinalizerEventEmitter;
pub use error::SweepTaskError;
pub use event::{
    BufferedSink, EventSink, FinalizerEvent, SymbolId, SymbolTable, Timestamp, TracingSink,
};
pub use periodic::PeriodicSweep;
pub use provenance::{resolve_code_source, RuntimeAccess};
pub use table::{EntryLookup, FinalizerCounts, FinalizerEntry, FinalizerTable};
pub use types::{ObjectHandle, TypeId};
