//! Operational HTTP endpoints.
//!
//! - `/healthz`  : liveness
//! - `/readyz`   : readiness (503 when draining)
//! - `/metrics`  : Prometheus text format
//! - `/debug/gc` : last sweep and tracked identity counts (JSON)

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::app_state::AppState;

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    if state.is_draining() {
        (StatusCode::SERVICE_UNAVAILABLE, "draining")
    } else {
        (StatusCode::OK, "ready")
    }
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    let body = state.metrics().render();

    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
        .into_response()
}

pub async fn debug_gc(State(state): State<AppState>) -> Response {
    let tracker = state.tracker();
    let metrics = &state.cfg().metrics;
    Json(json!({
        "gc_interval_secs": metrics.gc_interval().as_secs(),
        "staleness_window_secs": metrics.staleness_window().as_secs(),
        "tracked_resources": tracker.tracked_resources(),
        "tracked_instances": tracker.tracked_instances(),
        "last_sweep": state.last_sweep(),
    }))
    .into_response()
}
