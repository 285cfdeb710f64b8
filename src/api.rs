use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::dispatch::DispatchSummary;
use crate::facade::QueryFacade;
use crate::ingest::types::SourceId;
use crate::snapshot::{Snapshot, SourceStatus};

#[derive(Clone)]
pub struct AppState {
    pub facade: QueryFacade,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/get_earthquake_data", get(get_earthquake_data))
        .route("/get_cyclone_data", get(get_cyclone_data))
        .route("/status", get(status))
        .route("/send_to_model", get(send_to_model))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Serializes a snapshot without copying its records, and exposes its age.
struct SnapshotJson(Arc<Snapshot>);

impl IntoResponse for SnapshotJson {
    fn into_response(self) -> Response {
        let mut resp = Json(&self.0.records).into_response();
        if let Some(ts) = self.0.as_of {
            if let Ok(v) = HeaderValue::from_str(&ts.to_rfc3339()) {
                resp.headers_mut().insert("x-snapshot-as-of", v);
            }
        }
        resp.headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        resp
    }
}

async fn get_earthquake_data(State(state): State<AppState>) -> SnapshotJson {
    SnapshotJson(state.facade.snapshot(SourceId::Seismic))
}

async fn get_cyclone_data(State(state): State<AppState>) -> SnapshotJson {
    SnapshotJson(state.facade.snapshot(SourceId::Cyclone))
}

async fn status(State(state): State<AppState>) -> Json<Vec<SourceStatus>> {
    Json(state.facade.status())
}

async fn send_to_model(State(state): State<AppState>) -> Json<DispatchSummary> {
    Json(state.facade.trigger_dispatch().await)
}
