//! # Snapshot Store
//! Latest normalized record list per source.
//!
//! Each source owns one slot holding an `Arc<Snapshot>`. A replace builds the
//! new snapshot outside the lock and swaps the pointer under a write lock held
//! only for the swap; readers clone the `Arc` under a read lock. Published
//! snapshots are never mutated, so a reader holding one keeps a consistent view.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use metrics::gauge;
use serde::Serialize;

use crate::ingest::types::{Record, SourceId};

/// Complete, immutable set of records for one source.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub records: Vec<Record>,
    /// Time of the replace that installed this snapshot; `None` before the first fetch.
    pub as_of: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Freshness summary for one source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceStatus {
    pub source: SourceId,
    pub records: usize,
    pub as_of: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct SnapshotStore {
    // Keys are fixed at construction; only slot contents change.
    slots: BTreeMap<SourceId, RwLock<Arc<Snapshot>>>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    /// One empty snapshot per known source.
    pub fn new() -> Self {
        let slots = SourceId::ALL
            .into_iter()
            .map(|s| (s, RwLock::new(Arc::new(Snapshot::default()))))
            .collect();
        Self { slots }
    }

    /// Install `records` as the snapshot for `source`, stamped with the current time.
    pub fn replace(&self, source: SourceId, records: Vec<Record>) -> Arc<Snapshot> {
        self.replace_at(source, records, Utc::now())
    }

    pub fn replace_at(
        &self,
        source: SourceId,
        records: Vec<Record>,
        as_of: DateTime<Utc>,
    ) -> Arc<Snapshot> {
        let next = Arc::new(Snapshot {
            records,
            as_of: Some(as_of),
        });
        let prev = {
            let mut slot = self.slot(source).write().unwrap_or_else(|p| p.into_inner());
            std::mem::replace(&mut *slot, Arc::clone(&next))
        };
        // freed outside the lock
        drop(prev);

        gauge!("ingest_records", "source" => source.as_str()).set(next.len() as f64);
        gauge!("ingest_last_replace_ts", "source" => source.as_str())
            .set(as_of.timestamp() as f64);
        next
    }

    /// Most recently published snapshot for `source` (empty before the first replace).
    pub fn read(&self, source: SourceId) -> Arc<Snapshot> {
        let slot = self.slot(source).read().unwrap_or_else(|p| p.into_inner());
        Arc::clone(&*slot)
    }

    pub fn status(&self) -> Vec<SourceStatus> {
        self.slots
            .keys()
            .map(|&source| {
                let snap = self.read(source);
                SourceStatus {
                    source,
                    records: snap.len(),
                    as_of: snap.as_of,
                }
            })
            .collect()
    }

    fn slot(&self, source: SourceId) -> &RwLock<Arc<Snapshot>> {
        // Every SourceId variant is inserted in `new`.
        &self.slots[&source]
    }
}
