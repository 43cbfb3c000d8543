//! Transfer session — owns one connection for the lifetime of one
//! submission attempt.
//!
//! Strict ordering contract: one Text envelope, then every chunk as a
//! Binary frame in sequence order, then listen for the evaluation on the
//! same connection. A failure anywhere restarts the whole submission on a
//! fresh connection with a fresh envelope — partially sent chunk sequences
//! are never resumed.

use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, watch};
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use platen_core::wire::{EvaluationResult, SubmissionMetadata, CLOSE_PROCESSING_FAILURE};

use crate::chunk::Chunker;
use crate::correlate::ResponseCorrelator;
use crate::monitor::{classify_close, CloseClass, ConnectionEvent, LifecycleMonitor};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    MetadataSent,
    Streaming,
    AwaitingResult,
    Completed,
    Failed,
}

/// Why a submission attempt failed.
///
/// User-visible wording distinguishes "your input was invalid" (which is
/// [`crate::envelope::ValidationError`], raised before any session exists)
/// from "the transfer failed" from "the server rejected your job".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("could not reach the evaluation endpoint: {0}")]
    Connect(String),

    #[error("connection lost mid-transfer — restart the submission to retry")]
    ConnectionLost,

    #[error("the server failed while processing the submitted job")]
    ServerProcessingFailure,

    #[error("submission aborted by the caller")]
    Aborted,
}

impl SessionError {
    /// Whether starting a brand-new session is a sensible reaction.
    /// Never triggers automatically — all retries are caller-initiated.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionError::Connect(_) | SessionError::ConnectionLost)
    }
}

/// Progress snapshot published on the session's watch channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransferProgress {
    pub state: SessionState,
    pub chunks_sent: u32,
    pub total_chunks: u32,
}

/// Cancels a running submission. Cloneable; triggering after completion is
/// a no-op.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    tx: broadcast::Sender<()>,
}

impl AbortHandle {
    pub fn abort(&self) {
        let _ = self.tx.send(());
    }
}

/// One submission attempt over one exclusively-owned connection.
///
/// Nothing else writes to the connection — the ordering contract depends
/// on it. Dropping the session closes the connection.
pub struct TransferSession {
    endpoint: String,
    monitor: LifecycleMonitor,
    progress_tx: watch::Sender<TransferProgress>,
    abort_tx: broadcast::Sender<()>,
}

impl TransferSession {
    /// `endpoint` is the ws:// URL of the evaluation channel.
    pub fn new(endpoint: impl Into<String>) -> Self {
        let (progress_tx, _) = watch::channel(TransferProgress::default());
        let (abort_tx, _) = broadcast::channel(1);
        Self {
            endpoint: endpoint.into(),
            monitor: LifecycleMonitor::new(),
            progress_tx,
            abort_tx,
        }
    }

    pub fn state(&self) -> SessionState {
        self.progress_tx.borrow().state
    }

    /// Watch chunks-sent / state as the transfer runs.
    pub fn progress(&self) -> watch::Receiver<TransferProgress> {
        self.progress_tx.subscribe()
    }

    /// Handle for cancelling this session from another task.
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            tx: self.abort_tx.clone(),
        }
    }

    /// Run one complete submission: envelope, chunks, evaluation.
    ///
    /// Consumes the session — a retry needs a new session and a new
    /// envelope. `metadata.total_chunk_count` must describe `source`;
    /// envelopes built through [`crate::envelope::EnvelopeBuilder`] always
    /// do.
    pub async fn submit(
        mut self,
        metadata: SubmissionMetadata,
        source: Bytes,
    ) -> Result<EvaluationResult, SessionError> {
        let total = metadata.total_chunk_count;
        let correlator = ResponseCorrelator::new(metadata.correlation_id);
        let mut abort_rx = self.abort_tx.subscribe();

        let (ws, _) = match connect_async(self.endpoint.as_str()).await {
            Ok(ok) => ok,
            Err(err) => {
                self.set_state(SessionState::Failed, 0, total);
                return Err(SessionError::Connect(err.to_string()));
            }
        };
        self.monitor.observe(&ConnectionEvent::Opened);
        let (mut sink, mut stream) = ws.split();

        // Envelope first — no binary frame may precede it.
        let envelope =
            serde_json::to_string(&metadata).expect("envelope serialization failed");
        if let Err(err) = sink.send(Message::Text(envelope.into())).await {
            return Err(self.fail_from_send(err, &mut stream, 0, total).await);
        }
        self.set_state(SessionState::MetadataSent, 0, total);
        tracing::debug!(
            correlation_id = %metadata.correlation_id,
            file = %metadata.source_file_name,
            chunks = total,
            "envelope sent"
        );

        // Fire-and-forget chunk stream, strictly in sequence order. Each
        // payload is released as soon as the frame is handed off.
        self.set_state(SessionState::Streaming, 0, total);
        let mut sent = 0u32;
        for chunk in Chunker::new(source) {
            tokio::select! {
                biased;

                _ = abort_rx.recv() => {
                    return Err(self.abort(&mut sink, sent, total).await);
                }

                result = sink.send(Message::Binary(chunk.payload)) => {
                    if let Err(err) = result {
                        return Err(self.fail_from_send(err, &mut stream, sent, total).await);
                    }
                }
            }
            sent += 1;
            self.set_state(SessionState::Streaming, sent, total);
        }
        tracing::debug!(chunks = sent, "all chunks sent, awaiting evaluation");

        // Same connection, now inbound: the evaluation result, eventually.
        // No timeout here — an external watchdog may abort us instead.
        self.set_state(SessionState::AwaitingResult, sent, total);
        loop {
            tokio::select! {
                biased;

                _ = abort_rx.recv() => {
                    return Err(self.abort(&mut sink, sent, total).await);
                }

                inbound = stream.next() => match inbound {
                    Some(Ok(Message::Text(text))) => {
                        self.monitor.observe(&ConnectionEvent::MessageReceived);
                        if let Some(result) = correlator.accept(text.as_str()) {
                            self.set_state(SessionState::Completed, sent, total);
                            let _ = sink
                                .send(Message::Close(Some(CloseFrame {
                                    code: CloseCode::Normal,
                                    reason: "".into(),
                                })))
                                .await;
                            return Ok(result);
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        return Err(self.fail_from_close(frame, sent, total));
                    }
                    Some(Ok(_)) => {
                        // Binary or ping chatter — not part of the contract.
                        self.monitor.observe(&ConnectionEvent::MessageReceived);
                    }
                    Some(Err(err)) => {
                        return Err(self.fail_from_ws_error(err, sent, total));
                    }
                    None => {
                        return Err(self.fail_from_close(None, sent, total));
                    }
                }
            }
        }
    }

    fn set_state(&mut self, state: SessionState, chunks_sent: u32, total_chunks: u32) {
        let _ = self.progress_tx.send(TransferProgress {
            state,
            chunks_sent,
            total_chunks,
        });
    }

    /// A failed send usually means the peer already dropped us. Drain one
    /// inbound event to learn whether a close frame made it through before
    /// the reset, then classify.
    async fn fail_from_send(
        &mut self,
        err: WsError,
        stream: &mut WsSource,
        sent: u32,
        total: u32,
    ) -> SessionError {
        tracing::debug!(error = %err, chunks_sent = sent, "send failed, draining close signal");
        match stream.next().await {
            Some(Ok(Message::Close(frame))) => self.fail_from_close(frame, sent, total),
            Some(Err(err)) => self.fail_from_ws_error(err, sent, total),
            _ => self.fail_from_close(None, sent, total),
        }
    }

    fn fail_from_close(
        &mut self,
        frame: Option<CloseFrame>,
        sent: u32,
        total: u32,
    ) -> SessionError {
        let (code, reason) = match frame {
            Some(frame) => (u16::from(frame.code), frame.reason.to_string()),
            // Dropped without a closing handshake — observed as the
            // abnormal-closure code deployments use for "the server failed
            // while processing the submitted form".
            None => (CLOSE_PROCESSING_FAILURE, String::new()),
        };
        self.monitor.observe(&ConnectionEvent::Closed { code, reason });
        self.set_state(SessionState::Failed, sent, total);
        match classify_close(code) {
            CloseClass::ProcessingFailure => SessionError::ServerProcessingFailure,
            // A clean close before any result still leaves the submission
            // unevaluated; either way the caller restarts from scratch.
            CloseClass::Clean | CloseClass::ConnectionLost => SessionError::ConnectionLost,
        }
    }

    fn fail_from_ws_error(&mut self, err: WsError, sent: u32, total: u32) -> SessionError {
        match err {
            // Both shapes of "the peer vanished without a closing
            // handshake" — an RST surfaces as an I/O error, an EOF as the
            // protocol violation. RFC 6455 calls both abnormal closure.
            WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) | WsError::Io(_) => {
                self.fail_from_close(None, sent, total)
            }
            other => {
                self.monitor
                    .observe(&ConnectionEvent::ErrorObserved(other.to_string()));
                self.set_state(SessionState::Failed, sent, total);
                SessionError::ConnectionLost
            }
        }
    }

    async fn abort(&mut self, sink: &mut WsSink, sent: u32, total: u32) -> SessionError {
        tracing::info!(chunks_sent = sent, "submission aborted by caller");
        let _ = sink.close().await;
        self.set_state(SessionState::Failed, sent, total);
        SessionError::Aborted
    }
}
