//! platend — print-job price-evaluation daemon.
//!
//! Receives chunked submissions on a WebSocket channel, prices them, and
//! tracks the resulting orders behind a small JSON API.

pub mod handlers;
pub mod pricing;
pub mod state;
pub mod store;
pub mod ws;

use axum::routing::{get, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

pub use state::{new_transfer_table, AppState};
pub use store::OrderStore;

/// Build the full API router. Public so tests can mount the daemon
/// in-process on an ephemeral port.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/backendstatus", get(handlers::handle_backend_status))
        .route("/orders", get(handlers::handle_orders))
        .route("/orders/modify", put(handlers::handle_modify_order))
        .route("/evaluate", get(ws::evaluate_handler))
        .with_state(state);

    Router::new().nest("/api", api_routes).layer(cors)
}

pub async fn serve(state: AppState, bind_addr: String, port: u16) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(format!("{bind_addr}:{port}")).await?;
    tracing::info!(%bind_addr, port, "API listening");
    axum::serve(listener, app).await?;
    Ok(())
}
