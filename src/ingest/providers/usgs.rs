// src/ingest/providers/usgs.rs
//! USGS FDSN event service (GeoJSON) adapter.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use metrics::{counter, histogram};
use serde::Deserialize;

use crate::config::SeismicConfig;
use crate::error::FeedError;
use crate::http::HttpClient;
use crate::ingest::types::{
    FocalMechanism, Reading, Record, SeismicEvent, SourceAdapter, SourceId,
};

// Items stay untyped here so one malformed feature cannot fail the batch.
#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    id: Reading<String>,
    #[serde(default)]
    properties: Option<Properties>,
    #[serde(default)]
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(default)]
    coordinates: Vec<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Properties {
    time: Reading<i64>,
    updated: Reading<i64>,
    mag: Reading<f64>,
    #[serde(rename = "magType")]
    mag_type: Reading<String>,
    #[serde(rename = "magError")]
    mag_error: Reading<f64>,
    #[serde(rename = "depthError")]
    depth_error: Reading<f64>,
    place: Reading<String>,
    nst: Reading<u32>,
    rms: Reading<f64>,
    gap: Reading<f64>,
    dmin: Reading<f64>,
    strike: Reading<f64>,
    dip: Reading<f64>,
    rake: Reading<f64>,
    tsunami: Option<serde_json::Value>,
    alert: Reading<String>,
    #[serde(rename = "type")]
    event_type: Reading<String>,
    status: Reading<String>,
    url: Reading<String>,
}

/// Region is the text after the last `", "` of the place, or the whole place.
pub fn derive_region(place: &str) -> String {
    match place.rsplit_once(", ") {
        Some((_, region)) => region.to_string(),
        None => place.to_string(),
    }
}

fn is_truthy(v: Option<&serde_json::Value>) -> bool {
    use serde_json::Value;
    match v {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|x| x != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

fn coordinate(geometry: Option<&Geometry>, idx: usize) -> Reading<f64> {
    match geometry.and_then(|g| g.coordinates.get(idx)) {
        Some(v) => Reading::from_json(v.clone()),
        None => Reading::Missing,
    }
}

fn normalize_feature(f: Feature) -> SeismicEvent {
    let p = f.properties.unwrap_or_default();
    let geometry = f.geometry.as_ref();
    let region = p.place.clone().map(|place| derive_region(&place));

    SeismicEvent {
        id: f.id,
        time: p.time,
        updated: p.updated,
        magnitude: p.mag,
        mag_type: p.mag_type,
        magnitude_error: p.mag_error,
        // GeoJSON order: [longitude, latitude, depth]
        latitude: coordinate(geometry, 1),
        longitude: coordinate(geometry, 0),
        depth_km: coordinate(geometry, 2),
        depth_error: p.depth_error,
        location: p.place,
        region,
        seismic_stations: p.nst,
        rms: p.rms,
        gap: p.gap,
        dmin: p.dmin,
        focal_mechanism: FocalMechanism {
            strike: p.strike,
            dip: p.dip,
            rake: p.rake,
        },
        tsunami_alert: is_truthy(p.tsunami.as_ref()),
        tsunami_warning: p.alert,
        event_type: p.event_type,
        status: p.status,
        url: p.url,
    }
}

/// Parse a GeoJSON body into normalized records, preserving provider order.
///
/// Fails only when the body itself has the wrong shape; a feature that is not
/// an object of the expected layout is skipped and counted.
pub fn parse_feature_collection(body: &[u8]) -> Result<Vec<Record>, FeedError> {
    let fc: FeatureCollection = serde_json::from_slice(body)
        .map_err(|e| FeedError::malformed(SourceId::Seismic.as_str(), &e, body))?;

    let mut out = Vec::with_capacity(fc.features.len());
    for (idx, raw) in fc.features.into_iter().enumerate() {
        match serde_json::from_value::<Feature>(raw) {
            Ok(f) => out.push(Record::Seismic(normalize_feature(f))),
            Err(e) => {
                counter!("ingest_items_skipped_total", "source" => "seismic").increment(1);
                tracing::warn!(target: "ingest", source = "seismic", idx, error = %e, "feature skipped");
            }
        }
    }
    Ok(out)
}

pub struct UsgsProvider {
    client: Arc<dyn HttpClient>,
    cfg: SeismicConfig,
}

impl UsgsProvider {
    pub fn new(client: Arc<dyn HttpClient>, cfg: SeismicConfig) -> Self {
        Self { client, cfg }
    }

    /// Query for one UTC day; the same date is used as start and end.
    pub fn query_for(&self, day: NaiveDate) -> Vec<(&'static str, String)> {
        let date = day.format("%Y-%m-%d").to_string();
        vec![
            ("format", "geojson".to_string()),
            ("starttime", date.clone()),
            ("endtime", date),
            ("minmagnitude", self.cfg.min_magnitude.to_string()),
            ("orderby", self.cfg.order_by.clone()),
            ("limit", self.cfg.limit.to_string()),
            ("eventtype", self.cfg.event_type.clone()),
        ]
    }
}

#[async_trait]
impl SourceAdapter for UsgsProvider {
    fn source(&self) -> SourceId {
        SourceId::Seismic
    }

    async fn fetch_and_normalize(&self) -> Result<Vec<Record>, FeedError> {
        let query = self.query_for(Utc::now().date_naive());
        let body = self
            .client
            .get(&self.cfg.url, &query)
            .await
            .map_err(|e| FeedError::from_http(self.source().as_str(), e))?;

        let t0 = std::time::Instant::now();
        let out = parse_feature_collection(&body)?;
        histogram!("ingest_parse_ms", "source" => "seismic")
            .record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("ingest_events_total", "source" => "seismic").increment(out.len() as u64);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_is_text_after_last_separator() {
        assert_eq!(derive_region("10km NW of Springfield, CA"), "CA");
        assert_eq!(derive_region("Pacific Ocean"), "Pacific Ocean");
        assert_eq!(derive_region("5 km S of Town, Prov, Country"), "Country");
        // a bare comma is not the separator
        assert_eq!(derive_region("Fiji,Tonga"), "Fiji,Tonga");
    }

    #[test]
    fn tsunami_truthiness() {
        use serde_json::json;
        assert!(is_truthy(Some(&json!(1))));
        assert!(!is_truthy(Some(&json!(0))));
        assert!(!is_truthy(Some(&json!(null))));
        assert!(!is_truthy(None));
        assert!(is_truthy(Some(&json!(true))));
        assert!(!is_truthy(Some(&json!(""))));
    }

    #[test]
    fn query_uses_same_day_for_start_and_end() {
        struct Never;
        #[async_trait]
        impl HttpClient for Never {
            async fn get(
                &self,
                _: &str,
                _: &[(&str, String)],
            ) -> Result<Vec<u8>, crate::error::HttpError> {
                unreachable!()
            }
            async fn post_json(
                &self,
                _: &str,
                _: &serde_json::Value,
            ) -> Result<u16, crate::error::HttpError> {
                unreachable!()
            }
        }

        let p = UsgsProvider::new(Arc::new(Never), SeismicConfig::default());
        let q = p.query_for(NaiveDate::from_ymd_opt(2025, 3, 7).unwrap());
        let get = |k: &str| q.iter().find(|(n, _)| *n == k).map(|(_, v)| v.as_str());
        assert_eq!(get("starttime"), Some("2025-03-07"));
        assert_eq!(get("endtime"), Some("2025-03-07"));
        assert_eq!(get("minmagnitude"), Some("3"));
        assert_eq!(get("limit"), Some("50"));
        assert_eq!(get("orderby"), Some("time-asc"));
        assert_eq!(get("eventtype"), Some("earthquake"));
        assert_eq!(get("format"), Some("geojson"));
    }

    #[test]
    fn coordinates_map_to_lat_lon_depth() {
        let body = br#"{"features":[{"id":"x","properties":{},"geometry":{"coordinates":[-120.5,36.1,8.2]}}]}"#;
        let out = parse_feature_collection(body).unwrap();
        let Record::Seismic(ev) = &out[0] else {
            panic!("expected seismic record")
        };
        assert_eq!(ev.longitude, Reading::Value(-120.5));
        assert_eq!(ev.latitude, Reading::Value(36.1));
        assert_eq!(ev.depth_km, Reading::Value(8.2));
        assert_eq!(ev.location, Reading::Missing);
        assert_eq!(ev.region, Reading::Missing);
    }

    #[test]
    fn odd_field_types_do_not_drop_the_batch() {
        let body = br#"{"features":[
            {"id":"ok","properties":{"nst":12,"mag":4.1},"geometry":{"coordinates":[1.0,2.0,3.0]}},
            {"id":"odd","properties":{"nst":12.0,"mag":"4.2"},"geometry":{"coordinates":["1.5",null]}},
            {"id":"bare","properties":null,"geometry":null},
            "not a feature",
            {"id":"tail","properties":{"place":"Off the coast, Japan"}}
        ]}"#;
        let out = parse_feature_collection(body).unwrap();
        assert_eq!(out.len(), 4, "only the non-object item is skipped");

        let Record::Seismic(ok) = &out[0] else {
            panic!("expected seismic record")
        };
        assert_eq!(ok.seismic_stations, Reading::Value(12));

        let v = serde_json::to_value(&out[1]).unwrap();
        assert_eq!(v["seismic_stations"], serde_json::json!(12.0));
        assert_eq!(v["magnitude"], serde_json::json!("4.2"));
        assert_eq!(v["longitude"], serde_json::json!("1.5"));
        assert_eq!(v["latitude"], serde_json::Value::Null);
        assert_eq!(v["depth_km"], serde_json::json!("N/A"));

        let v = serde_json::to_value(&out[2]).unwrap();
        assert_eq!(v["id"], serde_json::json!("bare"));
        assert_eq!(v["magnitude"], serde_json::json!("N/A"));
        assert_eq!(v["latitude"], serde_json::json!("N/A"));
        assert_eq!(v["tsunami_alert"], serde_json::json!(false));

        let Record::Seismic(tail) = &out[3] else {
            panic!("expected seismic record")
        };
        assert_eq!(tail.region, Reading::Value("Japan".to_string()));
    }

    #[test]
    fn wrong_shape_is_a_provider_error() {
        let err = parse_feature_collection(br#"{"features": 7}"#).unwrap_err();
        assert!(!err.is_transport());
        assert_eq!(err.target(), "seismic");
    }
}
