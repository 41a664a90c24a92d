use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use txwatch_detection::MetricsSnapshot;

use crate::state::AppState;

pub async fn welcome() -> &'static str {
    "Welcome to the txwatch transaction API"
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub detection: MetricsSnapshot,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        detection: state.detection.snapshot(),
    })
}
