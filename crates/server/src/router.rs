//! HTTP router construction.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(api::welcome))
        .route("/health", get(api::health))
        .route("/api/v1/transaction", post(api::create_transaction))
        .route("/api/v1/transaction/{id}", get(api::get_transaction))
        .route("/api/v1/transactions", get(api::list_transactions))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
