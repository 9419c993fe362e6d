//! End-to-end tests for the unload and sweep emission paths.

use finalizer_events::{
    BufferedSink, EntryLookup, FinalizerCounts, FinalizerEvent, FinalizerEventEmitter,
    FinalizerTable, ObjectHandle, RuntimeAccess, SymbolId, SymbolTable, TypeId,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

/// In-memory stand-in for the hosted runtime's object graph: wires a type to
/// a protection domain, the domain to a code source, and the code source to
/// a location string.
#[derive(Default)]
struct TestRuntime {
    domains: HashMap<TypeId, ObjectHandle>,
    sources: HashMap<ObjectHandle, ObjectHandle>,
    locations: HashMap<ObjectHandle, String>,
}

impl TestRuntime {
    fn with_location(mut self, type_id: TypeId, location: &str) -> Self {
        let raw = type_id.as_u64();
        let domain = ObjectHandle::new(raw * 2 + 1);
        let source = ObjectHandle::new(raw * 2 + 2);
        self.domains.insert(type_id, domain);
        self.sources.insert(domain, source);
        self.locations.insert(source, location.to_owned());
        self
    }
}

impl RuntimeAccess for TestRuntime {
    fn protection_domain(&self, type_id: TypeId) -> Option<ObjectHandle> {
        self.domains.get(&type_id).copied()
    }

    fn code_source(&self, domain: ObjectHandle) -> Option<ObjectHandle> {
        self.sources.get(&domain).copied()
    }

    fn source_location(&self, code_source: ObjectHandle) -> Option<String> {
        self.locations.get(&code_source).cloned()
    }
}

struct Fixture {
    table: Arc<FinalizerTable>,
    sink: Arc<BufferedSink>,
    emitter: FinalizerEventEmitter,
}

fn fixture(runtime: TestRuntime) -> Fixture {
    let table = Arc::new(FinalizerTable::new());
    let sink = Arc::new(BufferedSink::new());
    let emitter = FinalizerEventEmitter::new(
        table.clone() as Arc<dyn EntryLookup>,
        Arc::new(runtime),
        Arc::new(SymbolTable::new()),
        sink.clone(),
    );
    Fixture {
        table,
        sink,
        emitter,
    }
}

fn populate(table: &FinalizerTable, type_id: TypeId, counts: FinalizerCounts) {
    for _ in 0..counts.registered {
        table.register_instance(type_id);
    }
    for _ in 0..counts.enqueued {
        table.notify_enqueued(type_id);
    }
    for _ in 0..counts.finalized {
        table.notify_finalized(type_id);
    }
}

fn counts_of(event: &FinalizerEvent) -> FinalizerCounts {
    FinalizerCounts {
        registered: event.registered,
        enqueued: event.enqueued,
        finalized: event.finalized,
    }
}

#[test]
fn unload_without_entry_emits_zero_counters_and_empty_provenance() {
    let f = fixture(TestRuntime::default());

    f.emitter.emit_unload_event(TypeId::new(99));

    let events = f.sink.drain();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].overriding_type, TypeId::new(99));
    assert_eq!(counts_of(&events[0]), FinalizerCounts::ZERO);
    assert_eq!(events[0].code_source, SymbolId::NONE);
}

#[test]
fn unload_reports_live_counters_and_resolved_provenance() {
    let ty = TypeId::new(5);
    let f = fixture(TestRuntime::default().with_location(ty, "file:/opt/app/app.jar"));
    populate(
        &f.table,
        ty,
        FinalizerCounts {
            registered: 5,
            enqueued: 3,
            finalized: 2,
        },
    );

    f.emitter.emit_unload_event(ty);

    let events = f.sink.drain();
    assert_eq!(events.len(), 1);
    assert_eq!(
        counts_of(&events[0]),
        FinalizerCounts {
            registered: 5,
            enqueued: 3,
            finalized: 2
        }
    );
    assert_eq!(
        f.emitter.symbols().lookup(events[0].code_source).as_deref(),
        Some("file:/opt/app/app.jar")
    );
}

#[test]
fn unload_after_purge_emits_zero_counters() {
    let ty = TypeId::new(8);
    let f = fixture(TestRuntime::default().with_location(ty, "file:/opt/app/app.jar"));
    populate(
        &f.table,
        ty,
        FinalizerCounts {
            registered: 4,
            enqueued: 4,
            finalized: 4,
        },
    );

    // Cleanup pass evicted the entry before the unload event fired.
    f.table.purge(ty).unwrap();
    f.emitter.emit_unload_event(ty);

    let events = f.sink.drain();
    assert_eq!(events.len(), 1);
    assert_eq!(counts_of(&events[0]), FinalizerCounts::ZERO);
    // Provenance still resolves: the type's metadata is read live, not from
    // the evicted entry.
    assert_ne!(events[0].code_source, SymbolId::NONE);
}

#[test]
fn sweep_emits_one_event_per_type_with_one_shared_timestamp() {
    let mut runtime = TestRuntime::default();
    let mut expected = HashMap::new();
    for raw in 0..4u64 {
        let ty = TypeId::new(raw);
        runtime = runtime.with_location(ty, &format!("file:/lib/{raw}.jar"));
        expected.insert(
            ty,
            FinalizerCounts {
                registered: raw + 3,
                enqueued: raw + 1,
                finalized: raw,
            },
        );
    }
    let f = fixture(runtime);
    for (ty, counts) in &expected {
        populate(&f.table, *ty, *counts);
    }

    let emitted = f.emitter.emit_sweep_events();
    assert_eq!(emitted, 4);

    let events = f.sink.drain();
    assert_eq!(events.len(), 4);
    let first = events[0].end_time;
    for event in &events {
        assert_eq!(event.end_time, first, "sweep timestamps must be identical");
        assert_eq!(counts_of(event), expected[&event.overriding_type]);
    }
}

#[test]
fn unresolved_provenance_never_skips_an_entry() {
    let with = TypeId::new(1);
    let without = TypeId::new(2);
    let f = fixture(TestRuntime::default().with_location(with, "file:/lib/with.jar"));
    populate(
        &f.table,
        with,
        FinalizerCounts {
            registered: 1,
            enqueued: 0,
            finalized: 0,
        },
    );
    populate(
        &f.table,
        without,
        FinalizerCounts {
            registered: 2,
            enqueued: 1,
            finalized: 1,
        },
    );

    assert_eq!(f.emitter.emit_sweep_events(), 2);

    let events = f.sink.drain();
    let by_type: HashMap<_, _> = events.iter().map(|e| (e.overriding_type, e)).collect();
    assert_ne!(by_type[&with].code_source, SymbolId::NONE);
    assert_eq!(by_type[&without].code_source, SymbolId::NONE);
}

#[test]
fn consecutive_sweeps_have_non_decreasing_timestamps() {
    let f = fixture(TestRuntime::default());
    populate(
        &f.table,
        TypeId::new(1),
        FinalizerCounts {
            registered: 1,
            enqueued: 0,
            finalized: 0,
        },
    );

    f.emitter.emit_sweep_events();
    let first = f.sink.drain();
    f.emitter.emit_sweep_events();
    let second = f.sink.drain();

    assert!(second[0].end_time >= first[0].end_time);
}

#[test]
fn same_location_interns_to_the_same_symbol_across_events() {
    let a = TypeId::new(1);
    let b = TypeId::new(2);
    let mut runtime = TestRuntime::default();
    // Two types, one jar.
    let domain_a = ObjectHandle::new(100);
    let domain_b = ObjectHandle::new(200);
    let source = ObjectHandle::new(300);
    runtime.domains.insert(a, domain_a);
    runtime.domains.insert(b, domain_b);
    runtime.sources.insert(domain_a, source);
    runtime.sources.insert(domain_b, source);
    runtime
        .locations
        .insert(source, "file:/lib/shared.jar".to_owned());

    let f = fixture(runtime);
    populate(
        &f.table,
        a,
        FinalizerCounts {
            registered: 1,
            enqueued: 0,
            finalized: 0,
        },
    );
    populate(
        &f.table,
        b,
        FinalizerCounts {
            registered: 1,
            enqueued: 0,
            finalized: 0,
        },
    );

    f.emitter.emit_sweep_events();
    let events = f.sink.drain();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].code_source, events[1].code_source);
    assert_eq!(f.emitter.symbols().len(), 1);
}

#[test]
fn concurrent_unload_and_sweep_commit_immutable_well_formed_events() {
    // Counters are stable while the two paths race, so every committed
    // event must carry exactly the populated values. This checks that
    // concurrent emission never corrupts an already-built event.
    let types: Vec<TypeId> = (0..8).map(TypeId::new).collect();
    let mut runtime = TestRuntime::default();
    for ty in &types {
        runtime = runtime.with_location(*ty, &format!("file:/lib/{}.jar", ty.as_u64()));
    }
    let f = fixture(runtime);
    let expected = FinalizerCounts {
        registered: 6,
        enqueued: 4,
        finalized: 3,
    };
    for ty in &types {
        populate(&f.table, *ty, expected);
    }

    let emitter = Arc::new(f.emitter);
    let sweeps: Vec<_> = (0..2)
        .map(|_| {
            let emitter = emitter.clone();
            thread::spawn(move || {
                let mut emitted = 0;
                for _ in 0..20 {
                    emitted += emitter.emit_sweep_events();
                }
                emitted
            })
        })
        .collect();
    let unloads: Vec<_> = types
        .iter()
        .map(|ty| {
            let emitter = emitter.clone();
            let ty = *ty;
            thread::spawn(move || {
                for _ in 0..10 {
                    emitter.emit_unload_event(ty);
                }
                10usize
            })
        })
        .collect();

    let mut expected_total = 0;
    for handle in sweeps.into_iter().chain(unloads) {
        expected_total += handle.join().unwrap();
    }

    let events = f.sink.drain();
    assert_eq!(events.len(), expected_total, "no event may be lost");
    for event in &events {
        assert_eq!(counts_of(event), expected);
        assert!(counts_of(event).is_consistent());
        assert_ne!(event.code_source, SymbolId::NONE);
    }
}
