//! Forwarding of the cyclone snapshot to the downstream model, record by record.

pub mod http_sink;

use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use serde::Serialize;

use crate::error::FeedError;
use crate::ingest::scheduler::Job;
use crate::ingest::types::{Record, SourceId};
use crate::snapshot::SnapshotStore;

pub use http_sink::HttpSink;

pub const NO_DATA_MESSAGE: &str = "No cyclone data available.";
pub const SENT_MESSAGE: &str = "Cyclone data sent to model.";
pub const PARTIAL_MESSAGE: &str = "Cyclone data partially sent to model.";
pub const FAILED_MESSAGE: &str = "Cyclone data could not be sent to model.";

/// Receives one record at a time.
#[async_trait]
pub trait DownstreamSink: Send + Sync {
    async fn send(&self, record: &Record) -> Result<(), FeedError>;
}

/// Result of one dispatch pass. Partial failure is reported, not raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub message: String,
    pub attempted: usize,
    pub failed: usize,
}

pub struct Dispatcher {
    store: Arc<SnapshotStore>,
    sink: Arc<dyn DownstreamSink>,
}

impl Dispatcher {
    pub fn new(store: Arc<SnapshotStore>, sink: Arc<dyn DownstreamSink>) -> Self {
        Self { store, sink }
    }

    /// Send every record of the current cyclone snapshot.
    ///
    /// The snapshot is read once up front; a replace during the pass does not
    /// change what this pass sends.
    pub async fn dispatch_latest(&self) -> DispatchSummary {
        crate::ingest::ensure_metrics_described();
        let snap = self.store.read(SourceId::Cyclone);
        if snap.is_empty() {
            tracing::info!(target: "dispatch", "no cyclone data available; nothing sent");
            return DispatchSummary {
                message: NO_DATA_MESSAGE.to_string(),
                attempted: 0,
                failed: 0,
            };
        }

        let mut failed = 0usize;
        for (idx, record) in snap.records.iter().enumerate() {
            match self.sink.send(record).await {
                Ok(()) => {}
                Err(e) => {
                    failed += 1;
                    tracing::warn!(target: "dispatch", idx, error = %e, "record send failed");
                }
            }
        }

        let attempted = snap.len();
        counter!("dispatch_attempted_total").increment(attempted as u64);
        counter!("dispatch_failed_total").increment(failed as u64);
        tracing::info!(target: "dispatch", attempted, failed, "dispatch pass finished");

        let message = match failed {
            0 => SENT_MESSAGE,
            f if f == attempted => FAILED_MESSAGE,
            _ => PARTIAL_MESSAGE,
        };
        DispatchSummary {
            message: message.to_string(),
            attempted,
            failed,
        }
    }
}

/// Scheduled dispatch pass.
pub struct DispatchJob {
    dispatcher: Arc<Dispatcher>,
}

impl DispatchJob {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl Job for DispatchJob {
    fn name(&self) -> &str {
        "dispatch"
    }

    async fn run(&self) -> anyhow::Result<()> {
        // Per-record failures are already logged and counted.
        self.dispatcher.dispatch_latest().await;
        Ok(())
    }
}
