//! platend — Platen price-evaluation daemon.

use std::time::Instant;

use anyhow::{Context, Result};

use platen_core::config::PlatenConfig;
use platend::{new_transfer_table, AppState, OrderStore};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = PlatenConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = PlatenConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        PlatenConfig::default()
    });

    tracing::info!(
        db = %config.storage.db_path.display(),
        received = %config.storage.received_dir.display(),
        "platend starting"
    );

    let store =
        OrderStore::open(&config.storage.db_path).context("failed to open order store")?;
    std::fs::create_dir_all(&config.storage.received_dir)
        .context("failed to create received-orders directory")?;

    let state = AppState {
        store,
        transfers: new_transfer_table(),
        received_dir: config.storage.received_dir.clone(),
        rate_per_minute: config.pricing.rate_per_minute,
        started_at: Instant::now(),
    };

    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::broadcast::channel::<()>(1);

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    let server_task = tokio::spawn(platend::serve(
        state,
        config.network.bind_addr.clone(),
        config.network.api_port,
    ));

    // ── Wait for exit ────────────────────────────────────────────────────────
    tokio::select! {
        _ = shutdown_rx.recv() => tracing::info!("shutting down"),
        r = server_task        => tracing::error!("server task exited: {:?}", r),
    }

    Ok(())
}
