//! Emitted event records, the provenance string interner, and event sinks.

use crate::types::TypeId;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Monotonic event clock: nanoseconds since the first capture in this
/// process. Monotonicity matters more than wall-clock meaning here, because
/// consumers order and group events by it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn now() -> Self {
        let epoch = *EPOCH.get_or_init(Instant::now);
        Timestamp(epoch.elapsed().as_nanos() as u64)
    }

    pub fn as_nanos(self) -> u64 {
        self.0
    }
}

/// Interned identifier for a code-source location string.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct SymbolId(u64);

impl SymbolId {
    /// Sentinel for "no resolvable code source". Never allocated by the
    /// interner.
    pub const NONE: SymbolId = SymbolId(0);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Concurrent interner mapping code-source locations to stable ids.
///
/// Events carry ids rather than strings so repeated sweeps over the same
/// types stay cheap for the transport layer.
pub struct SymbolTable {
    by_name: DashMap<String, SymbolId>,
    by_id: DashMap<SymbolId, String>,
    next: AtomicU64,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            by_name: DashMap::new(),
            by_id: DashMap::new(),
            // Id 0 is reserved for SymbolId::NONE.
            next: AtomicU64::new(1),
        }
    }

    /// Intern `name`, returning its stable id. Idempotent: the same string
    /// always maps to the same id, even under concurrent calls.
    pub fn intern(&self, name: &str) -> SymbolId {
        if let Some(id) = self.by_name.get(name) {
            return *id;
        }
        // Two threads may race past the fast path; entry() arbitrates so a
        // single id wins. A lost allocation from `next` leaves a gap, which
        // is harmless.
        let id = *self
            .by_name
            .entry(name.to_owned())
            .or_insert_with(|| SymbolId(self.next.fetch_add(1, Ordering::Relaxed)));
        self.by_id.entry(id).or_insert_with(|| name.to_owned());
        id
    }

    pub fn lookup(&self, id: SymbolId) -> Option<String> {
        self.by_id.get(&id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

/// One emitted diagnostic record. Immutable once constructed; the emitter
/// hands it to the sink by value and never touches it again.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FinalizerEvent {
    pub end_time: Timestamp,
    pub overriding_type: TypeId,
    /// Interned code-source location, or [`SymbolId::NONE`].
    pub code_source: SymbolId,
    pub registered: u64,
    pub enqueued: u64,
    pub finalized: u64,
}

/// Receives fully-built events.
///
/// Implementations must be non-blocking from the emitter's perspective
/// (buffered) and never reject a well-formed event.
pub trait EventSink: Send + Sync {
    fn commit(&self, event: FinalizerEvent);
}

/// Sink that buffers events in memory until drained by the embedder.
#[derive(Default)]
pub struct BufferedSink {
    events: Mutex<Vec<FinalizerEvent>>,
}

impl BufferedSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all buffered events, leaving the buffer empty.
    pub fn drain(&self) -> Vec<FinalizerEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Copy of the buffered events without draining them.
    pub fn snapshot(&self) -> Vec<FinalizerEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for BufferedSink {
    fn commit(&self, event: FinalizerEvent) {
        self.events.lock().push(event);
    }
}

/// Sink that writes each event as a structured log record.
pub struct TracingSink;

impl EventSink for TracingSink {
    fn commit(&self, event: FinalizerEvent) {
        tracing::debug!(
            end_time = event.end_time.as_nanos(),
            overriding_type = event.overriding_type.as_u64(),
            code_source = event.code_source.as_u64(),
            registered = event.registered,
            enqueued = event.enqueued,
            finalized = event.finalized,
            "finalizer event"
        );
    }
}
