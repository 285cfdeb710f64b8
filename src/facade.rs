//! Read/trigger entry point for the request surface.

use std::sync::Arc;

use crate::dispatch::{DispatchSummary, Dispatcher};
use crate::ingest::types::{Record, SourceId};
use crate::snapshot::{Snapshot, SnapshotStore, SourceStatus};

#[derive(Clone)]
pub struct QueryFacade {
    store: Arc<SnapshotStore>,
    dispatcher: Arc<Dispatcher>,
}

impl QueryFacade {
    pub fn new(store: Arc<SnapshotStore>, dispatcher: Arc<Dispatcher>) -> Self {
        Self { store, dispatcher }
    }

    /// Current records for `source`; empty before the first successful fetch.
    pub fn get(&self, source: SourceId) -> Vec<Record> {
        self.store.read(source).records.clone()
    }

    /// Shared handle to the current snapshot, for callers that only serialize it.
    pub fn snapshot(&self, source: SourceId) -> Arc<Snapshot> {
        self.store.read(source)
    }

    pub fn status(&self) -> Vec<SourceStatus> {
        self.store.status()
    }

    /// Run a dispatch pass now, outside the schedule.
    pub async fn trigger_dispatch(&self) -> DispatchSummary {
        self.dispatcher.dispatch_latest().await
    }
}
