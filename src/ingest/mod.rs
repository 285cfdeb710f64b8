// src/ingest/mod.rs
pub mod providers;
pub mod scheduler;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, histogram};
use once_cell::sync::OnceCell;

use crate::error::FeedError;
use crate::ingest::scheduler::Job;
use crate::ingest::types::{SourceAdapter, SourceId};
use crate::snapshot::SnapshotStore;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_fetch_total", "Successful provider fetch cycles.");
        describe_counter!(
            "ingest_fetch_errors_total",
            "Provider fetch/parse errors; snapshot left as-is."
        );
        describe_counter!("ingest_events_total", "Records normalized from providers.");
        describe_counter!(
            "ingest_items_skipped_total",
            "Provider items dropped because they were not objects of the expected layout."
        );
        describe_counter!(
            "ingest_skipped_total",
            "Fetch invocations skipped because one was already in flight."
        );
        describe_histogram!("ingest_fetch_ms", "Fetch + normalize time in milliseconds.");
        describe_histogram!("ingest_parse_ms", "Provider parse time in milliseconds.");
        describe_gauge!("ingest_records", "Records in the current snapshot.");
        describe_gauge!(
            "ingest_last_replace_ts",
            "Unix ts of the last successful snapshot replace."
        );
        describe_counter!("dispatch_attempted_total", "Records sent downstream.");
        describe_counter!("dispatch_failed_total", "Downstream sends that failed.");
        describe_counter!("scheduler_ticks_total", "Scheduled job invocations.");
        describe_counter!(
            "scheduler_job_failures_total",
            "Job invocations that returned an error or panicked."
        );
    });
}

/// Outcome of one fetch attempt for a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Snapshot replaced with this many records (zero is still a replace).
    Replaced(usize),
    /// Another fetch for the same source was in flight; nothing done.
    Skipped,
}

/// Fetch one source and publish the result.
///
/// On error the store is not touched, so readers keep the previous snapshot.
pub async fn run_once(
    adapter: &dyn SourceAdapter,
    store: &SnapshotStore,
) -> Result<usize, FeedError> {
    ensure_metrics_described();
    let source = adapter.source();
    let t0 = std::time::Instant::now();

    let result = adapter.fetch_and_normalize().await;
    histogram!("ingest_fetch_ms", "source" => source.as_str())
        .record(t0.elapsed().as_secs_f64() * 1_000.0);

    match result {
        Ok(records) => {
            let n = records.len();
            store.replace(source, records);
            counter!("ingest_fetch_total", "source" => source.as_str()).increment(1);
            tracing::info!(target: "ingest", source = %source, records = n, "snapshot replaced");
            Ok(n)
        }
        Err(e) => {
            counter!("ingest_fetch_errors_total", "source" => source.as_str()).increment(1);
            if let FeedError::Provider { body, .. } = &e {
                tracing::debug!(target: "ingest", source = %source, body = %body, "provider response");
            }
            Err(e)
        }
    }
}

/// Scheduled fetch for one source.
///
/// Holds an in-flight guard so two fetches of the same source never run at
/// once; the loser of a collision is skipped rather than queued.
pub struct FetchJob {
    adapter: Arc<dyn SourceAdapter>,
    store: Arc<SnapshotStore>,
    in_flight: tokio::sync::Mutex<()>,
    name: String,
}

impl FetchJob {
    pub fn new(adapter: Arc<dyn SourceAdapter>, store: Arc<SnapshotStore>) -> Self {
        let name = format!("fetch:{}", adapter.source());
        Self {
            adapter,
            store,
            in_flight: tokio::sync::Mutex::new(()),
            name,
        }
    }

    pub fn source(&self) -> SourceId {
        self.adapter.source()
    }

    pub async fn fetch(&self) -> Result<FetchOutcome, FeedError> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            counter!("ingest_skipped_total", "source" => self.source().as_str()).increment(1);
            tracing::debug!(target: "ingest", source = %self.source(), "fetch already in flight; skipped");
            return Ok(FetchOutcome::Skipped);
        };
        run_once(self.adapter.as_ref(), &self.store)
            .await
            .map(FetchOutcome::Replaced)
    }
}

#[async_trait]
impl Job for FetchJob {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> anyhow::Result<()> {
        self.fetch().await?;
        Ok(())
    }
}
