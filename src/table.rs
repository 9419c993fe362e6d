//! Tracking table for types that override the legacy finalization hook.
//!
//! Lifecycle-transition callbacks mutate the counters; the event emitter only
//! ever reads them. The table's `RwLock` is the structural serialization
//! point: it keeps the *set* of tracked types from changing shape during a
//! traversal, not the counters within an entry.

use crate::types::TypeId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Point-in-time copy of one entry's counters.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FinalizerCounts {
    pub registered: u64,
    pub enqueued: u64,
    pub finalized: u64,
}

impl FinalizerCounts {
    pub const ZERO: FinalizerCounts = FinalizerCounts {
        registered: 0,
        enqueued: 0,
        finalized: 0,
    };

    /// An instance must be registered before it can be enqueued, and enqueued
    /// before its finalizer runs, so `finalized <= enqueued <= registered`
    /// holds for any quiescent entry. A violation indicates a bug in the
    /// lifecycle callbacks feeding this table.
    pub fn is_consistent(self) -> bool {
        self.finalized <= self.enqueued && self.enqueued <= self.registered
    }
}

/// Lifecycle counters for one finalizable type.
///
/// All counters use `Ordering::Relaxed` because they are independent and do
/// not synchronize memory between threads. We only care that updates are
/// atomic, not when they become visible relative to other memory operations.
/// A concurrent reader may therefore observe in-flight values.
pub struct FinalizerEntry {
    type_id: TypeId,
    registered: AtomicU64,
    enqueued: AtomicU64,
    finalized: AtomicU64,
}

impl FinalizerEntry {
    fn new(type_id: TypeId) -> Self {
        Self {
            type_id,
            registered: AtomicU64::new(0),
            enqueued: AtomicU64::new(0),
            finalized: AtomicU64::new(0),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// An instance of this type became finalizable.
    pub fn on_registered(&self) {
        self.registered.fetch_add(1, Ordering::Relaxed);
    }

    /// An instance became unreachable and was queued for finalization.
    pub fn on_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    /// An instance's finalization hook finished executing.
    pub fn on_finalized(&self) {
        self.finalized.fetch_add(1, Ordering::Relaxed);
    }

    pub fn counts(&self) -> FinalizerCounts {
        FinalizerCounts {
            registered: self.registered.load(Ordering::Relaxed),
            enqueued: self.enqueued.load(Ordering::Relaxed),
            finalized: self.finalized.load(Ordering::Relaxed),
        }
    }
}

impl Debug for FinalizerEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let counts = self.counts();
        f.debug_struct("FinalizerEntry")
            .field("type_id", &self.type_id)
            .field("registered", &counts.registered)
            .field("enqueued", &counts.enqueued)
            .field("finalized", &counts.finalized)
            .finish()
    }
}

/// Read access to the set of currently tracked types.
///
/// `for_each` must present one coherent set of entries for the duration of
/// the traversal; how that is achieved (a held reader lock, a copy-on-write
/// snapshot) is the implementation's choice. Iteration order is stable
/// within one call but otherwise unspecified.
pub trait EntryLookup: Send + Sync {
    /// Point lookup. `None` if the type is not (or no longer) tracked.
    fn find(&self, type_id: TypeId) -> Option<Arc<FinalizerEntry>>;

    /// Visit every tracked entry. The callback returns `true` to continue
    /// iterating.
    fn for_each(&self, f: &mut dyn FnMut(&FinalizerEntry) -> bool);
}

/// The runtime's finalizer tracking table.
///
/// Entries are created on a type's first instance registration and removed
/// when the type is unloaded. Removal may race with an unload-path lookup;
/// the emitter tolerates the miss.
pub struct FinalizerTable {
    entries: RwLock<HashMap<TypeId, Arc<FinalizerEntry>>>,
}

impl FinalizerTable {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Record that an instance of `type_id` became finalizable, creating the
    /// tracking entry on the type's first registration.
    pub fn register_instance(&self, type_id: TypeId) {
        {
            let entries = self.entries.read();
            if let Some(entry) = entries.get(&type_id) {
                entry.on_registered();
                return;
            }
        }
        // First instance of this type; upgrade to a write lock. Another
        // thread may have won the race, entry() arbitrates.
        let mut entries = self.entries.write();
        entries
            .entry(type_id)
            .or_insert_with(|| Arc::new(FinalizerEntry::new(type_id)))
            .on_registered();
    }

    /// Record that an instance was queued for finalization.
    pub fn notify_enqueued(&self, type_id: TypeId) {
        if let Some(entry) = self.entries.read().get(&type_id) {
            entry.on_enqueued();
        }
    }

    /// Record that an instance's finalization hook ran.
    pub fn notify_finalized(&self, type_id: TypeId) {
        if let Some(entry) = self.entries.read().get(&type_id) {
            entry.on_finalized();
        }
    }

    /// Evict the entry for an unloaded type, returning it if present.
    pub fn purge(&self, type_id: TypeId) -> Option<Arc<FinalizerEntry>> {
        self.entries.write().remove(&type_id)
    }

    /// Number of types currently tracked.
    pub fn tracked_types(&self) -> usize {
        self.entries.read().len()
    }
}

impl Default for FinalizerTable {
    fn default() -> Self {
        Self::new()
    }
}

impl EntryLookup for FinalizerTable {
    fn find(&self, type_id: TypeId) -> Option<Arc<FinalizerEntry>> {
        self.entries.read().get(&type_id).cloned()
    }

    fn for_each(&self, f: &mut dyn FnMut(&FinalizerEntry) -> bool) {
        // The reader lock is held for the whole pass so the caller observes
        // a set of tracked types that does not shrink or grow mid-traversal.
        let entries = self.entries.read();
        for entry in entries.values() {
            if !f(entry) {
                break;
            }
        }
    }
}
