//! Transaction create, list and lookup endpoints.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::error;

use txwatch_core::{Filter, NewTransaction, Transaction};
use txwatch_ingest::IngestError;
use txwatch_store::TransactionStore;

use super::{bad_request, conflict, internal_error, not_found, parse_bool, ApiResult};
use crate::state::AppState;

pub async fn create_transaction(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewTransaction>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Transaction>)> {
    let Json(raw) = payload.map_err(|e| bad_request(format!("invalid request body: {}", e.body_text())))?;

    match state.ingestion.create_transaction(raw).await {
        Ok(tx) => Ok((StatusCode::CREATED, Json(tx))),
        Err(IngestError::Validation(msg)) => Err(bad_request(msg)),
        Err(IngestError::Conflict(msg)) => Err(conflict(msg)),
        Err(IngestError::Store(e)) => {
            error!(error = %e, "Failed to create transaction");
            Err(internal_error("failed to create transaction"))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub user_id: Option<String>,
    pub suspicious: Option<String>,
}

pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<Transaction>>> {
    let user_id = params
        .user_id
        .filter(|u| !u.is_empty())
        .ok_or_else(|| bad_request("user_id query parameter is required"))?;

    let mut filter = Filter::new().user(user_id);
    if let Some(raw) = params.suspicious.as_deref().filter(|s| !s.is_empty()) {
        let suspicious =
            parse_bool(raw).ok_or_else(|| bad_request(format!("invalid value for suspicious: '{}'", raw)))?;
        filter = filter.suspicious(suspicious);
    }

    state.store.query(&filter).await.map(Json).map_err(|e| {
        error!(error = %e, "Failed to list transactions");
        internal_error("failed to list transactions")
    })
}

pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Transaction>> {
    match state.store.get(&id).await {
        Ok(Some(tx)) => Ok(Json(tx)),
        Ok(None) => Err(not_found(format!("no transaction found with id {}", id))),
        Err(e) => {
            error!(tx_id = %id, error = %e, "Failed to load transaction");
            Err(internal_error("failed to load transaction"))
        }
    }
}
