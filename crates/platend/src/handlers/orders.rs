//! /orders, /orders/modify handlers — plain request/response CRUD over the
//! order table. Deliberately boring: the interesting path is the
//! evaluation channel.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use platen_core::order::{ModifyOrderRequest, Order};

use crate::state::AppState;
use crate::store::StoreError;

pub async fn handle_orders(
    State(state): State<AppState>,
) -> Result<Json<Vec<Order>>, (StatusCode, String)> {
    state
        .store
        .list()
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

#[derive(Serialize)]
pub struct ModifyResponse {
    pub datetime: String,
    pub new_status: String,
}

/// Updates exactly the order whose `created_at` matches `datetime`; only
/// its status field changes.
pub async fn handle_modify_order(
    State(state): State<AppState>,
    Json(request): Json<ModifyOrderRequest>,
) -> Result<Json<ModifyResponse>, (StatusCode, String)> {
    match state
        .store
        .modify_status(&request.datetime, request.new_status)
    {
        Ok(()) => {
            tracing::info!(
                datetime = %request.datetime.to_rfc3339(),
                new_status = request.new_status.as_str(),
                "order status modified"
            );
            Ok(Json(ModifyResponse {
                datetime: request.datetime.to_rfc3339(),
                new_status: request.new_status.as_str().to_string(),
            }))
        }
        Err(err @ StoreError::NoSuchOrder(_)) => Err((StatusCode::NOT_FOUND, err.to_string())),
        Err(err) => Err((StatusCode::INTERNAL_SERVER_ERROR, err.to_string())),
    }
}
