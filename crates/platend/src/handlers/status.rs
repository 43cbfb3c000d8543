//! /backendstatus handler — the health probe that gates submissions.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct BackendStatusResponse {
    pub status: &'static str,
    pub uptime_secs: u64,
    /// Submissions currently streaming in over the evaluation channel.
    pub active_transfers: usize,
    pub orders: usize,
}

/// Clients must see a 2xx here before opening a transfer session; any
/// failure blocks form creation on their side.
pub async fn handle_backend_status(
    State(state): State<AppState>,
) -> Result<Json<BackendStatusResponse>, (StatusCode, String)> {
    let orders = state
        .store
        .count()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(BackendStatusResponse {
        status: "ok",
        uptime_secs: state.started_at.elapsed().as_secs(),
        active_transfers: state.transfers.len(),
        orders,
    }))
}
