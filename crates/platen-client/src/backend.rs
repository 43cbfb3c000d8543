//! HTTP collaborators — backend status probe and order listing/modification.
//!
//! Plain request/response calls, entirely separate from the chunked
//! submission channel. The status probe gates session creation: a backend
//! that does not answer 2xx must block the form and surface an inline
//! error instead of opening a connection.

use serde::Deserialize;

use platen_core::order::{ModifyOrderRequest, Order};

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("failed to reach the backend at {url}: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("backend is unhealthy (HTTP {status}) — submissions are blocked")]
    Unhealthy { status: u16 },

    #[error("no order exists with created_at {0}")]
    NoSuchOrder(String),

    #[error("unexpected response body: {0}")]
    BadResponse(#[source] reqwest::Error),
}

/// Snapshot returned by `GET /api/backendstatus`.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendStatus {
    pub status: String,
    pub uptime_secs: u64,
    pub active_transfers: usize,
    pub orders: usize,
}

/// Client for the daemon's plain HTTP surface.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    http: reqwest::Client,
}

impl BackendClient {
    /// `base_url` like `http://127.0.0.1:8080`, no trailing slash.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    /// The ws:// URL of the chunked submission channel on the same host.
    pub fn evaluate_endpoint(&self) -> String {
        format!("{}/api/evaluate", self.base_url.replacen("http", "ws", 1))
    }

    /// Health probe. Must pass before any transfer session is created.
    pub async fn probe(&self) -> Result<BackendStatus, BackendError> {
        let url = format!("{}/api/backendstatus", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| BackendError::Unreachable { url, source })?;
        if !response.status().is_success() {
            return Err(BackendError::Unhealthy {
                status: response.status().as_u16(),
            });
        }
        response.json().await.map_err(BackendError::BadResponse)
    }

    /// Fetch every placed order, oldest first.
    pub async fn orders(&self) -> Result<Vec<Order>, BackendError> {
        let url = format!("{}/api/orders", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| BackendError::Unreachable { url, source })?;
        if !response.status().is_success() {
            return Err(BackendError::Unhealthy {
                status: response.status().as_u16(),
            });
        }
        response.json().await.map_err(BackendError::BadResponse)
    }

    /// Change one order's lifecycle status, addressed by `created_at`.
    pub async fn modify_order(&self, request: &ModifyOrderRequest) -> Result<(), BackendError> {
        let url = format!("{}/api/orders/modify", self.base_url);
        let response = self
            .http
            .put(&url)
            .json(request)
            .send()
            .await
            .map_err(|source| BackendError::Unreachable { url, source })?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(BackendError::NoSuchOrder(request.datetime.to_rfc3339()));
        }
        if !response.status().is_success() {
            return Err(BackendError::Unhealthy {
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}
