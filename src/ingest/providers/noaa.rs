// src/ingest/providers/noaa.rs
//! NOAA / NHC active storm list adapter.

use std::sync::Arc;

use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Deserialize;

use crate::config::CycloneConfig;
use crate::error::FeedError;
use crate::http::HttpClient;
use crate::ingest::types::{CyclonePosition, Reading, Record, SourceAdapter, SourceId};

#[derive(Debug, Deserialize)]
struct ActiveStorms {
    #[serde(rename = "activeStorms", default)]
    active_storms: Vec<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Storm {
    #[serde(rename = "lastUpdate")]
    last_update: Reading<String>,
    latitude_numeric: Reading<f64>,
    longitude_numeric: Reading<f64>,
    #[serde(rename = "movementSpeed")]
    movement_speed: Reading<f64>,
    #[serde(rename = "movementDir")]
    movement_dir: Reading<f64>,
}

impl From<Storm> for CyclonePosition {
    fn from(s: Storm) -> Self {
        CyclonePosition {
            iso_time: s.last_update,
            lat: s.latitude_numeric,
            lon: s.longitude_numeric,
            storm_speed: s.movement_speed,
            storm_dir: s.movement_dir,
        }
    }
}

/// Parse the active storm list. A body without `activeStorms` means no storms.
/// Entries that are not objects are skipped and counted.
pub fn parse_active_storms(body: &[u8]) -> Result<Vec<Record>, FeedError> {
    let parsed: ActiveStorms = serde_json::from_slice(body)
        .map_err(|e| FeedError::malformed(SourceId::Cyclone.as_str(), &e, body))?;

    let mut out = Vec::with_capacity(parsed.active_storms.len());
    for (idx, raw) in parsed.active_storms.into_iter().enumerate() {
        match serde_json::from_value::<Storm>(raw) {
            Ok(storm) => out.push(Record::Cyclone(storm.into())),
            Err(e) => {
                counter!("ingest_items_skipped_total", "source" => "cyclone").increment(1);
                tracing::warn!(target: "ingest", source = "cyclone", idx, error = %e, "storm skipped");
            }
        }
    }
    Ok(out)
}

pub struct NoaaProvider {
    client: Arc<dyn HttpClient>,
    cfg: CycloneConfig,
}

impl NoaaProvider {
    pub fn new(client: Arc<dyn HttpClient>, cfg: CycloneConfig) -> Self {
        Self { client, cfg }
    }
}

#[async_trait]
impl SourceAdapter for NoaaProvider {
    fn source(&self) -> SourceId {
        SourceId::Cyclone
    }

    async fn fetch_and_normalize(&self) -> Result<Vec<Record>, FeedError> {
        let body = self
            .client
            .get(&self.cfg.url, &[])
            .await
            .map_err(|e| FeedError::from_http(self.source().as_str(), e))?;

        let t0 = std::time::Instant::now();
        let out = parse_active_storms(&body)?;
        histogram!("ingest_parse_ms", "source" => "cyclone")
            .record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("ingest_events_total", "source" => "cyclone").increment(out.len() as u64);
        Ok(out)
    }
}
