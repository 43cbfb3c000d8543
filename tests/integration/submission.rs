//! End-to-end submissions against the real daemon.

use anyhow::Result;

use platen_client::backend::BackendClient;
use platen_client::{EnvelopeBuilder, SessionState, TransferSession};
use platen_core::order::{Material, OrderStatus, Process};
use platen_core::wire::SubmissionMetadata;

use crate::{payload_of, spawn_daemon};

fn envelope_for(len: u64, name: &str) -> SubmissionMetadata {
    EnvelopeBuilder::new()
        .submitter(name, &format!("{}@example.org", name.to_lowercase()))
        .copies("2")
        .file("bracket.stl", len)
        .material(Material::PET)
        .process(Process::Precise)
        .build()
        .expect("valid form input")
}

#[tokio::test]
async fn end_to_end_submission_yields_a_priced_order() -> Result<()> {
    let daemon = spawn_daemon().await?;
    let client = BackendClient::new(daemon.base_url.clone());

    // The probe gates the session.
    let status = client.probe().await?;
    assert_eq!(status.status, "ok");
    assert_eq!(status.orders, 0);

    let source = payload_of(150_000);
    let metadata = envelope_for(150_000, "Ada");
    assert_eq!(metadata.total_chunk_count, 3);
    let correlation_id = metadata.correlation_id;

    let session = TransferSession::new(daemon.ws_url());
    let progress = session.progress();
    let result = session.submit(metadata, source.clone()).await?;

    // The result is correlated to this submission, not fuzzy-matched.
    assert_eq!(result.correlation_id, correlation_id);
    assert!(result.computed_price > 0.0);
    assert_eq!(result.source_file_name, "bracket.stl");

    let snapshot = *progress.borrow();
    assert_eq!(snapshot.state, SessionState::Completed);
    assert_eq!(snapshot.chunks_sent, 3);
    assert_eq!(snapshot.total_chunks, 3);

    // The order landed with status New and the same price.
    let orders = client.orders().await?;
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].status, OrderStatus::New);
    assert_eq!(orders[0].submitter_name, "Ada");
    assert_eq!(orders[0].copies_requested, 2);
    assert!((orders[0].computed_price - result.computed_price).abs() < 1e-9);

    // The artifact was reassembled byte-for-byte.
    assert_eq!(
        orders[0].content_hash,
        hex::encode(blake3::hash(&source).as_bytes())
    );

    // Nothing is left in the live-transfer table.
    assert_eq!(daemon.state.transfers.len(), 0);
    Ok(())
}

#[tokio::test]
async fn single_chunk_submission_works() -> Result<()> {
    let daemon = spawn_daemon().await?;

    let metadata = envelope_for(100, "Grace");
    assert_eq!(metadata.total_chunk_count, 1);

    let session = TransferSession::new(daemon.ws_url());
    let result = session.submit(metadata, payload_of(100)).await?;
    assert!(result.computed_price > 0.0);

    let client = BackendClient::new(daemon.base_url.clone());
    assert_eq!(client.orders().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn sequential_submissions_each_use_their_own_session() -> Result<()> {
    let daemon = spawn_daemon().await?;

    for name in ["Ada", "Grace", "Edsger"] {
        let metadata = envelope_for(70_000, name);
        let session = TransferSession::new(daemon.ws_url());
        session.submit(metadata, payload_of(70_000)).await?;
    }

    let client = BackendClient::new(daemon.base_url.clone());
    let orders = client.orders().await?;
    assert_eq!(orders.len(), 3);

    let status = client.probe().await?;
    assert_eq!(status.orders, 3);
    assert_eq!(status.active_transfers, 0);
    Ok(())
}

#[tokio::test]
async fn probe_failure_blocks_submission() {
    // Nothing listens on the discard port.
    let client = BackendClient::new("http://127.0.0.1:9");
    assert!(client.probe().await.is_err());
}
