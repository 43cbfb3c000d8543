//! Platen integration test harness.
//!
//! Tests mount the daemon router in-process on an ephemeral loopback port
//! and drive the real client library against it — no external processes,
//! no shared state between tests. Failure-path scenarios stand up
//! purpose-built scratch servers instead of the daemon.

use std::time::Instant;

use anyhow::Result;
use tempfile::TempDir;

use platend::{new_transfer_table, AppState, OrderStore};

mod failures;
mod orders;
mod submission;

// ── Harness ───────────────────────────────────────────────────────────────────

/// One in-process daemon on an ephemeral port. Scratch storage lives as
/// long as the handle.
pub struct TestDaemon {
    pub base_url: String,
    pub state: AppState,
    _scratch: TempDir,
}

impl TestDaemon {
    /// The chunked submission channel of this daemon.
    pub fn ws_url(&self) -> String {
        format!("{}/api/evaluate", self.base_url.replacen("http", "ws", 1))
    }
}

pub async fn spawn_daemon() -> Result<TestDaemon> {
    let scratch = tempfile::tempdir()?;
    let state = AppState {
        store: OrderStore::open_in_memory()?,
        transfers: new_transfer_table(),
        received_dir: scratch.path().join("received"),
        rate_per_minute: 0.01,
        started_at: Instant::now(),
    };

    let router = platend::router(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    Ok(TestDaemon {
        base_url: format!("http://{}", addr),
        state,
        _scratch: scratch,
    })
}

/// Deterministic test payload of the given size.
pub fn payload_of(len: usize) -> bytes::Bytes {
    bytes::Bytes::from((0..len).map(|i| (i % 251) as u8).collect::<Vec<u8>>())
}
