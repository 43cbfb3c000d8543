//! Evaluation channel — receives envelope-then-chunks submissions and
//! pushes the price evaluation back on the same connection.
//!
//! Inbound contract per submission: one Text frame (the envelope), then
//! exactly `total_chunk_count` Binary frames in order. After the last
//! chunk the daemon evaluates, stores the order, and replies with an
//! `evaluation_result` Text frame, then resets its per-connection state so
//! the socket can carry another submission.
//!
//! Failure behavior: an invalid envelope gets an explicit close frame; a
//! processing failure mid-transfer drops the socket without a closing
//! handshake, which clients observe as close code 1006 — the convention
//! existing deployments rely on.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use bytes::Bytes;
use chrono::Utc;

use platen_core::order::{Order, OrderStatus};
use platen_core::wire::{
    EvaluationResult, ServerMessage, SubmissionMetadata, WireError, CHUNK_SIZE,
    CLOSE_INVALID_ENVELOPE,
};

use crate::pricing;
use crate::state::{ActiveTransfer, AppState};

pub async fn evaluate_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| async move {
        let mut session = ReceiveSession::new();
        let result = run_session(&mut session, socket, &state).await;
        session.teardown(&state);
        if let Err(err) = result {
            tracing::error!(error = %err, "evaluation session failed, dropping connection");
        }
    })
}

async fn run_session(
    session: &mut ReceiveSession,
    mut socket: WebSocket,
    state: &AppState,
) -> Result<()> {
    while let Some(message) = socket.recv().await {
        let message = match message {
            Ok(message) => message,
            Err(err) => {
                tracing::debug!(error = %err, "socket error, ending session");
                return Ok(());
            }
        };

        match message {
            Message::Text(text) => {
                if let Err(err) = session.begin(state, text.as_str()) {
                    tracing::warn!(error = %err, "rejecting envelope");
                    let _ = socket
                        .send(Message::Close(Some(CloseFrame {
                            code: CLOSE_INVALID_ENVELOPE,
                            reason: Utf8Bytes::from_static("invalid envelope"),
                        })))
                        .await;
                    return Ok(());
                }
            }
            Message::Binary(payload) => match session.accept_chunk(state, payload) {
                Ok(None) => {}
                Ok(Some(result)) => {
                    let reply = serde_json::to_string(&ServerMessage::EvaluationResult(result))
                        .context("failed to serialize evaluation result")?;
                    socket
                        .send(Message::Text(reply.into()))
                        .await
                        .context("failed to send evaluation result")?;
                }
                // Returning the error drops the socket abruptly — the
                // peer sees the processing-failure close code.
                Err(err) => return Err(err),
            },
            Message::Close(_) => {
                tracing::debug!("peer closed the connection");
                return Ok(());
            }
            // Pings are answered by axum; pongs carry nothing for us.
            _ => {}
        }
    }
    Ok(())
}

/// Per-connection receive state. One submission at a time; reset after
/// each evaluation so the connection can be reused.
struct ReceiveSession {
    metadata: Option<SubmissionMetadata>,
    chunks_received: u32,
    bytes_received: u64,
    file: Option<std::fs::File>,
    file_path: Option<PathBuf>,
    hasher: blake3::Hasher,
}

#[derive(Debug, thiserror::Error)]
enum EnvelopeError {
    #[error("envelope is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] WireError),

    #[error("a transfer is already in progress on this connection")]
    TransferInProgress,
}

impl ReceiveSession {
    fn new() -> Self {
        Self {
            metadata: None,
            chunks_received: 0,
            bytes_received: 0,
            file: None,
            file_path: None,
            hasher: blake3::Hasher::new(),
        }
    }

    /// Handle the envelope frame. Must precede any binary frame, and a
    /// second envelope may only arrive once the previous submission has
    /// been fully evaluated.
    fn begin(&mut self, state: &AppState, text: &str) -> Result<(), EnvelopeError> {
        if self.metadata.is_some() {
            return Err(EnvelopeError::TransferInProgress);
        }
        let metadata: SubmissionMetadata = serde_json::from_str(text)?;
        metadata.validate()?;

        state.transfers.insert(
            metadata.correlation_id,
            ActiveTransfer {
                source_file_name: metadata.source_file_name.clone(),
                chunks_received: 0,
                total_chunk_count: metadata.total_chunk_count,
            },
        );
        tracing::info!(
            correlation_id = %metadata.correlation_id,
            submitter = %metadata.submitter_name,
            file = %metadata.source_file_name,
            chunks = metadata.total_chunk_count,
            "submission started"
        );
        self.metadata = Some(metadata);
        Ok(())
    }

    /// Handle one binary frame. Returns the evaluation once the final
    /// chunk has been appended.
    fn accept_chunk(
        &mut self,
        state: &AppState,
        payload: Bytes,
    ) -> Result<Option<EvaluationResult>> {
        let Some(metadata) = self.metadata.clone() else {
            // Original deployments tolerate stray binary frames before an
            // envelope rather than failing the connection.
            tracing::warn!(len = payload.len(), "binary frame before envelope, discarding");
            return Ok(None);
        };

        if payload.len() > CHUNK_SIZE {
            return Err(WireError::OversizedChunk {
                got: payload.len(),
                max: CHUNK_SIZE,
            }
            .into());
        }
        if self.chunks_received >= metadata.total_chunk_count {
            anyhow::bail!(
                "received more than the announced {} chunks",
                metadata.total_chunk_count
            );
        }

        if self.file.is_none() {
            self.open_artifact(state, &metadata.source_file_name)?;
        }
        let file = self.file.as_mut().expect("artifact file just opened");
        file.write_all(&payload)
            .context("failed to append chunk to artifact")?;
        self.hasher.update(&payload);
        self.bytes_received += payload.len() as u64;
        self.chunks_received += 1;

        if let Some(mut entry) = state.transfers.get_mut(&metadata.correlation_id) {
            entry.chunks_received = self.chunks_received;
        }
        tracing::debug!(
            correlation_id = %metadata.correlation_id,
            chunk = self.chunks_received,
            of = metadata.total_chunk_count,
            len = payload.len(),
            "chunk received"
        );

        if self.chunks_received == metadata.total_chunk_count {
            return self.finalize(state, metadata).map(Some);
        }
        Ok(None)
    }

    /// First chunk of a submission: (re)create the artifact file.
    fn open_artifact(&mut self, state: &AppState, source_file_name: &str) -> Result<()> {
        std::fs::create_dir_all(&state.received_dir)
            .context("failed to create received-orders directory")?;
        // Strip any path components a hostile client smuggled in.
        let safe_name = Path::new(source_file_name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".to_string());
        let path = state.received_dir.join(safe_name);
        if path.exists() {
            std::fs::remove_file(&path).context("failed to replace existing artifact")?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open artifact {}", path.display()))?;
        self.file = Some(file);
        self.file_path = Some(path);
        Ok(())
    }

    /// Last chunk is in: price the job, store the order, build the reply.
    fn finalize(
        &mut self,
        state: &AppState,
        metadata: SubmissionMetadata,
    ) -> Result<EvaluationResult> {
        let content_hash = hex::encode(self.hasher.finalize().as_bytes());
        let estimate = pricing::estimate(self.bytes_received, metadata.process_type);
        let price = pricing::calculate_price(
            &estimate,
            metadata.copies_requested,
            metadata.material_type,
            state.rate_per_minute,
        );

        let order = Order {
            created_at: Utc::now(),
            submitter_name: metadata.submitter_name.clone(),
            submitter_email: metadata.submitter_email.clone(),
            copies_requested: metadata.copies_requested,
            source_file_name: metadata.source_file_name.clone(),
            computed_price: price,
            material_type: metadata.material_type,
            process_type: metadata.process_type,
            status: OrderStatus::New,
            content_hash: content_hash.clone(),
        };
        state.store.insert(&order).context("failed to store order")?;

        let artifact = self
            .file_path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        tracing::info!(
            correlation_id = %metadata.correlation_id,
            bytes = self.bytes_received,
            content_hash = %content_hash,
            artifact = %artifact,
            price,
            "submission evaluated"
        );

        let result = EvaluationResult {
            correlation_id: metadata.correlation_id,
            submitter_name: metadata.submitter_name,
            submitter_email: metadata.submitter_email,
            copies_requested: metadata.copies_requested,
            source_file_name: metadata.source_file_name,
            material_type: metadata.material_type,
            process_type: metadata.process_type,
            computed_price: price,
        };

        self.reset(state);
        Ok(result)
    }

    fn reset(&mut self, state: &AppState) {
        if let Some(metadata) = self.metadata.take() {
            state.transfers.remove(&metadata.correlation_id);
        }
        self.chunks_received = 0;
        self.bytes_received = 0;
        self.file = None;
        self.file_path = None;
        self.hasher = blake3::Hasher::new();
    }

    /// End-of-connection cleanup; drops the in-flight transfer entry, if
    /// any.
    fn teardown(&mut self, state: &AppState) {
        if self.metadata.is_some() {
            tracing::debug!(
                chunks_received = self.chunks_received,
                "connection ended mid-transfer"
            );
        }
        self.reset(state);
    }
}
