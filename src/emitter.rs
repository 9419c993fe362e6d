//! The event emitter: converts tracking-table state into committed events.

use crate::event::{EventSink, FinalizerEvent, SymbolId, SymbolTable, Timestamp};
use crate::provenance::{resolve_code_source, RuntimeAccess};
use crate::table::{EntryLookup, FinalizerCounts, FinalizerEntry};
use crate::types::TypeId;
use std::sync::Arc;

/// Emits finalizer lifecycle diagnostics.
///
/// Two entry points: [`emit_unload_event`](Self::emit_unload_event) runs on
/// the thread unloading a type, [`emit_sweep_events`](Self::emit_sweep_events)
/// on the periodic task thread. Both are read-only with respect to the
/// table and best-effort with respect to provenance.
pub struct FinalizerEventEmitter {
    table: Arc<dyn EntryLookup>,
    runtime: Arc<dyn RuntimeAccess>,
    symbols: Arc<SymbolTable>,
    sink: Arc<dyn EventSink>,
}

impl FinalizerEventEmitter {
    pub fn new(
        table: Arc<dyn EntryLookup>,
        runtime: Arc<dyn RuntimeAccess>,
        symbols: Arc<SymbolTable>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            table,
            runtime,
            symbols,
            sink,
        }
    }

    /// The interner backing this emitter's `code_source` ids.
    pub fn symbols(&self) -> &Arc<SymbolTable> {
        &self.symbols
    }

    /// Emit the terminal event for a type being unloaded.
    ///
    /// The caller has already verified that `type_id` overrides the
    /// finalization hook. The table lookup happens at call time: a
    /// concurrent unload-cleanup pass may have evicted the entry already,
    /// in which case the event carries all-zero counters rather than being
    /// dropped. Commits exactly one event, no retries.
    pub fn emit_unload_event(&self, type_id: TypeId) {
        let entry = self.table.find(type_id);
        self.emit_event(entry.as_deref(), type_id, Timestamp::now());
    }

    /// Emit one event per currently tracked type.
    ///
    /// The timestamp is captured once, before iterating, and stamped on
    /// every event of the pass so consumers can correlate them as a single
    /// snapshot. The table holds its structural lock for the whole
    /// traversal; counters within an entry may still move concurrently and
    /// are read as-is. Returns the number of events emitted.
    pub fn emit_sweep_events(&self) -> usize {
        let timestamp = Timestamp::now();
        let mut emitted = 0usize;
        self.table.for_each(&mut |entry| {
            self.emit_event(Some(entry), entry.type_id(), timestamp);
            emitted += 1;
            true
        });
        tracing::debug!(events = emitted, "finalizer sweep pass complete");
        emitted
    }

    /// Single construction site shared by both paths. An unresolved
    /// provenance degrades `code_source` to the sentinel; it never skips
    /// the event.
    fn emit_event(&self, entry: Option<&FinalizerEntry>, type_id: TypeId, end_time: Timestamp) {
        let code_source = match resolve_code_source(self.runtime.as_ref(), type_id) {
            Some(location) => self.symbols.intern(&location),
            None => SymbolId::NONE,
        };
        let counts = entry.map(|e| e.counts()).unwrap_or(FinalizerCounts::ZERO);
        self.sink.commit(FinalizerEvent {
            end_time,
            overriding_type: type_id,
            code_source,
            registered: counts.registered,
            enqueued: counts.enqueued,
            finalized: counts.finalized,
        });
    }
}
