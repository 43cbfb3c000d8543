//! Failure-path scenarios: servers that drop, stall, or talk nonsense.
//!
//! These stand up purpose-built scratch WebSocket servers instead of the
//! daemon, so each misbehavior is deterministic.

use std::net::SocketAddr;

use anyhow::Result;
use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use uuid::Uuid;

use platen_client::{EnvelopeBuilder, SessionError, SessionState, TransferSession};
use platen_core::order::{Material, Process};
use platen_core::wire::{EvaluationResult, ServerMessage, SubmissionMetadata, CLOSE_NORMAL};

use crate::payload_of;

async fn spawn_ws(router: Router) -> Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr: SocketAddr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    Ok(format!("ws://{}/api/evaluate", addr))
}

fn envelope(len: u64) -> SubmissionMetadata {
    EnvelopeBuilder::new()
        .submitter("Ada", "ada@example.org")
        .copies("1")
        .file("bracket.stl", len)
        .material(Material::PLA)
        .process(Process::Standard)
        .build()
        .expect("valid form input")
}

fn result_for(metadata: &SubmissionMetadata, correlation_id: Uuid) -> String {
    serde_json::to_string(&ServerMessage::EvaluationResult(EvaluationResult {
        correlation_id,
        submitter_name: metadata.submitter_name.clone(),
        submitter_email: metadata.submitter_email.clone(),
        copies_requested: metadata.copies_requested,
        source_file_name: metadata.source_file_name.clone(),
        material_type: metadata.material_type,
        process_type: metadata.process_type,
        computed_price: 42.50,
    }))
    .expect("result serialization")
}

// ── A server that dies mid-transfer ───────────────────────────────────────────

async fn drop_mid_stream(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(|mut socket: WebSocket| async move {
        // Envelope, then one chunk, then vanish without a closing
        // handshake — exactly how a crashed processor looks on the wire.
        let _ = socket.recv().await;
        let _ = socket.recv().await;
    })
}

#[tokio::test]
async fn mid_stream_drop_is_a_server_processing_failure() -> Result<()> {
    let url = spawn_ws(Router::new().route("/api/evaluate", get(drop_mid_stream))).await?;

    let metadata = envelope(150_000);
    let session = TransferSession::new(url);
    let progress = session.progress();
    let err = session
        .submit(metadata, payload_of(150_000))
        .await
        .unwrap_err();

    assert_eq!(err, SessionError::ServerProcessingFailure);
    assert!(!err.is_retryable());
    assert_eq!(progress.borrow().state, SessionState::Failed);
    Ok(())
}

// ── A server that closes cleanly without ever evaluating ──────────────────────

async fn close_without_result(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(|mut socket: WebSocket| async move {
        let _ = socket.recv().await; // envelope
        let _ = socket.recv().await; // single chunk
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: CLOSE_NORMAL,
                reason: Utf8Bytes::from_static("maintenance"),
            })))
            .await;
    })
}

#[tokio::test]
async fn clean_close_without_result_is_a_lost_connection() -> Result<()> {
    let url = spawn_ws(Router::new().route("/api/evaluate", get(close_without_result))).await?;

    let metadata = envelope(100);
    let session = TransferSession::new(url);
    let err = session.submit(metadata, payload_of(100)).await.unwrap_err();

    assert_eq!(err, SessionError::ConnectionLost);
    assert!(err.is_retryable());
    Ok(())
}

// ── A server that mixes chatter and stale results into the stream ─────────────

async fn chatty_evaluator(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(|mut socket: WebSocket| async move {
        let Some(Ok(Message::Text(text))) = socket.recv().await else {
            return;
        };
        let metadata: SubmissionMetadata = match serde_json::from_str(text.as_str()) {
            Ok(metadata) => metadata,
            Err(_) => return,
        };

        // Gossip before the chunks even arrive.
        let _ = socket
            .send(Message::Text(Utf8Bytes::from_static(
                r#"{"message_kind":"server_gossip","seq":1}"#,
            )))
            .await;

        let mut received = 0;
        while received < metadata.total_chunk_count {
            match socket.recv().await {
                Some(Ok(Message::Binary(_))) => received += 1,
                Some(Ok(_)) => {}
                _ => return,
            }
        }

        // A malformed frame, then a result for somebody else, then the
        // real one. Only the last may reach the listener.
        let _ = socket
            .send(Message::Text(Utf8Bytes::from_static("not json at all")))
            .await;
        let _ = socket
            .send(Message::Text(result_for(&metadata, Uuid::new_v4()).into()))
            .await;
        let _ = socket
            .send(Message::Text(
                result_for(&metadata, metadata.correlation_id).into(),
            ))
            .await;

        // Hold the socket open until the client closes.
        let _ = socket.recv().await;
    })
}

#[tokio::test]
async fn unrelated_chatter_never_aborts_a_transfer() -> Result<()> {
    let url = spawn_ws(Router::new().route("/api/evaluate", get(chatty_evaluator))).await?;

    let metadata = envelope(150_000);
    let correlation_id = metadata.correlation_id;
    let session = TransferSession::new(url);
    let progress = session.progress();
    let result = session.submit(metadata, payload_of(150_000)).await?;

    assert_eq!(result.correlation_id, correlation_id);
    assert_eq!(result.computed_price, 42.50);
    assert_eq!(progress.borrow().state, SessionState::Completed);
    Ok(())
}

// ── Caller-initiated abort ────────────────────────────────────────────────────

async fn silent_sink(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(|mut socket: WebSocket| async move {
        // Swallow everything, never answer.
        while let Some(Ok(_)) = socket.recv().await {}
    })
}

#[tokio::test]
async fn abort_while_awaiting_result_fails_with_aborted() -> Result<()> {
    let url = spawn_ws(Router::new().route("/api/evaluate", get(silent_sink))).await?;

    let metadata = envelope(150_000);
    let session = TransferSession::new(url);
    let mut progress = session.progress();
    let abort = session.abort_handle();
    let task = tokio::spawn(session.submit(metadata, payload_of(150_000)));

    // Let the transfer finish streaming, then cancel the wait.
    progress
        .wait_for(|p| p.state == SessionState::AwaitingResult)
        .await?;
    abort.abort();

    let err = task.await?.unwrap_err();
    assert_eq!(err, SessionError::Aborted);
    assert!(!err.is_retryable());
    Ok(())
}
