// src/ingest/types.rs
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::FeedError;

/// Sentinel emitted for fields the provider payload does not carry at all.
pub const NOT_AVAILABLE: &str = "N/A";

/// Known hazard sources. The snapshot store holds exactly one slot per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    Seismic,
    Cyclone,
}

impl SourceId {
    pub const ALL: [SourceId; 2] = [SourceId::Seismic, SourceId::Cyclone];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceId::Seismic => "seismic",
            SourceId::Cyclone => "cyclone",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One provider field after normalization.
///
/// Deserializing with `#[serde(default)]` yields `Missing` for absent keys and
/// `Null` for explicit `null`. A scalar of the expected type becomes `Value`;
/// a scalar of another type is kept verbatim as `Raw`; arrays and objects
/// collapse to `Null`. Serializes to the value, the raw scalar, `null`, or
/// [`NOT_AVAILABLE`] respectively.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading<T> {
    Value(T),
    Raw(Value),
    Null,
    Missing,
}

impl<T> Default for Reading<T> {
    fn default() -> Self {
        Reading::Missing
    }
}

impl<T: DeserializeOwned> Reading<T> {
    pub fn from_json(raw: Value) -> Self {
        match raw {
            Value::Null | Value::Array(_) | Value::Object(_) => Reading::Null,
            scalar => match T::deserialize(&scalar) {
                Ok(v) => Reading::Value(v),
                Err(_) => Reading::Raw(scalar),
            },
        }
    }
}

impl<T> Reading<T> {
    pub fn as_value(&self) -> Option<&T> {
        match self {
            Reading::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reading<U> {
        match self {
            Reading::Value(v) => Reading::Value(f(v)),
            Reading::Raw(v) => Reading::Raw(v),
            Reading::Null => Reading::Null,
            Reading::Missing => Reading::Missing,
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Reading<T> {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Ok(Reading::from_json(Value::deserialize(d)?))
    }
}

impl<T: Serialize> Serialize for Reading<T> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Reading::Value(v) => v.serialize(s),
            Reading::Raw(v) => v.serialize(s),
            Reading::Null => s.serialize_none(),
            Reading::Missing => s.serialize_str(NOT_AVAILABLE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FocalMechanism {
    pub strike: Reading<f64>,
    pub dip: Reading<f64>,
    pub rake: Reading<f64>,
}

/// Normalized seismic event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeismicEvent {
    pub id: Reading<String>,
    /// Event origin time, unix milliseconds.
    pub time: Reading<i64>,
    pub updated: Reading<i64>,

    pub magnitude: Reading<f64>,
    pub mag_type: Reading<String>,
    pub magnitude_error: Reading<f64>,

    pub latitude: Reading<f64>,
    pub longitude: Reading<f64>,
    pub depth_km: Reading<f64>,
    pub depth_error: Reading<f64>,
    pub location: Reading<String>,
    pub region: Reading<String>,

    pub seismic_stations: Reading<u32>,
    pub rms: Reading<f64>,
    pub gap: Reading<f64>,
    pub dmin: Reading<f64>,

    pub focal_mechanism: FocalMechanism,

    pub tsunami_alert: bool,
    /// PAGER alert level: "green" | "yellow" | "orange" | "red".
    pub tsunami_warning: Reading<String>,

    pub event_type: Reading<String>,
    /// "automatic" | "reviewed"
    pub status: Reading<String>,
    pub url: Reading<String>,
}

/// Normalized cyclone position. Key names are the downstream model's input contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CyclonePosition {
    #[serde(rename = "ISO_TIME")]
    pub iso_time: Reading<String>,
    #[serde(rename = "LAT")]
    pub lat: Reading<f64>,
    #[serde(rename = "LON")]
    pub lon: Reading<f64>,
    #[serde(rename = "STORM_SPEED")]
    pub storm_speed: Reading<f64>,
    #[serde(rename = "STORM_DIR")]
    pub storm_dir: Reading<f64>,
}

/// One normalized record as held in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Record {
    Seismic(SeismicEvent),
    Cyclone(CyclonePosition),
}

/// Knows one provider's query and response schema.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> SourceId;

    /// One request, no retry. Normalization of the body is pure.
    async fn fetch_and_normalize(&self) -> Result<Vec<Record>, FeedError>;
}
