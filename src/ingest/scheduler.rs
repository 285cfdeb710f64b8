// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Unit of scheduled work. Errors are reported by the scheduler, never propagated.
#[async_trait]
pub trait Job: Send + Sync + 'static {
    fn name(&self) -> &str;
    async fn run(&self) -> anyhow::Result<()>;
}

struct Entry {
    job: Arc<dyn Job>,
    every: Duration,
    warm_up: bool,
}

/// Runs each registered job on its own tokio task and interval.
///
/// A worker awaits its job before waiting for the next tick, so a job never
/// overlaps itself; ticks missed while it runs are skipped.
pub struct Scheduler {
    entries: Vec<Entry>,
    shutdown: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            entries: Vec::new(),
            shutdown,
            workers: Vec::new(),
        }
    }

    pub fn register(&mut self, job: Arc<dyn Job>, every: Duration) -> &mut Self {
        self.entries.push(Entry {
            job,
            every,
            warm_up: false,
        });
        self
    }

    /// Like [`register`](Self::register), and the job also runs once in [`warm_up`](Self::warm_up).
    pub fn register_with_warm_up(&mut self, job: Arc<dyn Job>, every: Duration) -> &mut Self {
        self.entries.push(Entry {
            job,
            every,
            warm_up: true,
        });
        self
    }

    /// Run every warm-up job once, concurrently, and wait for all of them.
    pub async fn warm_up(&self) {
        let mut set = JoinSet::new();
        for e in self.entries.iter().filter(|e| e.warm_up) {
            let job = Arc::clone(&e.job);
            set.spawn(async move { run_guarded(job).await });
        }
        while set.join_next().await.is_some() {}
    }

    /// Spawn one worker per job. First scheduled run is one interval from now.
    pub fn start(&mut self) {
        if !self.workers.is_empty() {
            tracing::warn!(target: "scheduler", "start() called twice; ignored");
            return;
        }
        for e in &self.entries {
            let job = Arc::clone(&e.job);
            let every = e.every;
            let mut stop = self.shutdown.subscribe();
            self.workers.push(tokio::spawn(async move {
                let mut ticker = interval_at(Instant::now() + every, every);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                tracing::info!(target: "scheduler", job = job.name(), every_secs = every.as_secs(), "worker started");
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            counter!("scheduler_ticks_total", "job" => job.name().to_string()).increment(1);
                            run_guarded(Arc::clone(&job)).await;
                        }
                        _ = stop.changed() => break,
                    }
                }
                tracing::info!(target: "scheduler", job = job.name(), "worker stopped");
            }));
        }
    }

    /// Signal every worker and wait for them to exit.
    ///
    /// A job already running finishes first; it can only publish whole snapshots.
    pub async fn stop(&mut self) {
        let _ = self.shutdown.send(true);
        for w in self.workers.drain(..) {
            if let Err(e) = w.await {
                tracing::warn!(target: "scheduler", error = ?e, "worker join failed");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        !self.workers.is_empty()
    }
}

/// Run a job on its own task so a panic is contained, and report failures.
async fn run_guarded(job: Arc<dyn Job>) {
    let name = job.name().to_string();
    let task = tokio::spawn({
        let job = Arc::clone(&job);
        async move { job.run().await }
    });
    match task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            counter!("scheduler_job_failures_total", "job" => name.clone()).increment(1);
            let msg = format!("{e:#}");
            tracing::warn!(target: "scheduler", job = %name, error = %msg, "job failed");
        }
        Err(e) => {
            counter!("scheduler_job_failures_total", "job" => name.clone()).increment(1);
            tracing::error!(target: "scheduler", job = %name, error = ?e, "job panicked");
        }
    }
}
