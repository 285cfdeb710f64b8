// tests/snapshot_consistency.rs
//
// Concurrent replace/read on the store: every read must equal one complete
// batch that some replace installed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use hazard_feed::ingest::types::{CyclonePosition, Reading, Record};
use hazard_feed::{SnapshotStore, SourceId};

/// Batch `gen` has `gen % 7 + 1` records, all stamped with `gen`.
fn batch(gen: u32) -> Vec<Record> {
    (0..(gen % 7 + 1))
        .map(|i| {
            Record::Cyclone(CyclonePosition {
                iso_time: Reading::Value(format!("gen-{gen}")),
                lat: Reading::Value(f64::from(i)),
                lon: Reading::Value(0.0),
                storm_speed: Reading::Missing,
                storm_dir: Reading::Missing,
            })
        })
        .collect()
}

fn generation_of(records: &[Record]) -> Option<String> {
    let mut gens = records.iter().map(|r| match r {
        Record::Cyclone(c) => c.iso_time.as_value().cloned(),
        Record::Seismic(_) => None,
    });
    let first = gens.next()?;
    assert!(gens.all(|g| g == first), "torn snapshot: {records:?}");
    first
}

#[test]
fn readers_never_observe_a_torn_snapshot() {
    let store = Arc::new(SnapshotStore::new());
    let done = Arc::new(AtomicBool::new(false));

    let writer = {
        let store = Arc::clone(&store);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            for gen in 0..2_000u32 {
                store.replace(SourceId::Cyclone, batch(gen));
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut seen = 0usize;
                while !done.load(Ordering::SeqCst) {
                    let snap = store.read(SourceId::Cyclone);
                    if let Some(tag) = generation_of(&snap.records) {
                        let gen: u32 = tag.trim_start_matches("gen-").parse().unwrap();
                        assert_eq!(snap.records, batch(gen), "snapshot differs from its batch");
                        seen += 1;
                    }
                }
                seen
            })
        })
        .collect();

    writer.join().unwrap();
    for r in readers {
        r.join().unwrap();
    }

    let last = store.read(SourceId::Cyclone);
    assert_eq!(last.records, batch(1_999));
    // the seismic slot was never written
    assert!(store.read(SourceId::Seismic).is_empty());
}

#[test]
fn repeated_reads_without_fetch_are_identical() {
    let store = SnapshotStore::new();
    store.replace(SourceId::Cyclone, batch(3));
    let a = store.read(SourceId::Cyclone);
    let b = store.read(SourceId::Cyclone);
    assert_eq!(a, b);
    assert!(Arc::ptr_eq(&a, &b), "same published snapshot");
}
