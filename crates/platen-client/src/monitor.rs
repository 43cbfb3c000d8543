//! Connection lifecycle — observes transport events and classifies closures.

use platen_core::wire::{CLOSE_NORMAL, CLOSE_PROCESSING_FAILURE};

/// Observable transitions on the persistent connection.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    Opened,
    MessageReceived,
    Closed { code: u16, reason: String },
    ErrorObserved(String),
}

/// What a close signal means for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseClass {
    /// Code 1000. A no-op after a completed session.
    Clean,
    /// Code 1006 — the server failed while processing the submitted form.
    /// Surfaced to the user explicitly; never silently retried.
    ProcessingFailure,
    /// Any other non-clean close, or a transport-level error. Retryable by
    /// restarting the whole submission.
    ConnectionLost,
}

impl CloseClass {
    pub fn is_retryable(&self) -> bool {
        matches!(self, CloseClass::ConnectionLost)
    }
}

pub fn classify_close(code: u16) -> CloseClass {
    match code {
        CLOSE_NORMAL => CloseClass::Clean,
        CLOSE_PROCESSING_FAILURE => CloseClass::ProcessingFailure,
        _ => CloseClass::ConnectionLost,
    }
}

/// Tracks the lifecycle of one connection.
///
/// The transfer session feeds every transport event through here; the
/// monitor renders them as tracing events and remembers the terminal
/// signal so the session can decide how it failed.
#[derive(Debug, Default)]
pub struct LifecycleMonitor {
    closed: Option<(u16, String)>,
    errored: Option<String>,
    messages_seen: u64,
}

impl LifecycleMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, event: &ConnectionEvent) {
        match event {
            ConnectionEvent::Opened => {
                tracing::debug!("connection opened");
            }
            ConnectionEvent::MessageReceived => {
                self.messages_seen += 1;
            }
            ConnectionEvent::Closed { code, reason } => {
                tracing::info!(code, reason = %reason, "connection closed");
                self.closed = Some((*code, reason.clone()));
            }
            ConnectionEvent::ErrorObserved(detail) => {
                tracing::warn!(detail = %detail, "connection error");
                self.errored = Some(detail.clone());
            }
        }
    }

    /// Terminal classification, once a close or error has been observed.
    /// A transport error without a close signal counts as a lost
    /// connection.
    pub fn terminal_class(&self) -> Option<CloseClass> {
        if let Some((code, _)) = self.closed {
            return Some(classify_close(code));
        }
        if self.errored.is_some() {
            return Some(CloseClass::ConnectionLost);
        }
        None
    }
}
