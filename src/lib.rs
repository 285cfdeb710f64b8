// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod facade;
pub mod http;
pub mod ingest;
pub mod metrics;
pub mod pipeline;
pub mod snapshot;

// ---- Re-exports for stable public API ----
pub use crate::config::FeedConfig;
pub use crate::error::{FeedError, HttpError};
pub use crate::ingest::types::{Record, SourceId};
pub use crate::pipeline::Pipeline;
pub use crate::snapshot::{Snapshot, SnapshotStore};
