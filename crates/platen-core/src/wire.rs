//! Platen wire format — the on-wire contract between client and daemon.
//!
//! These types ARE the protocol. One submission is one WebSocket connection
//! carrying, in strict order:
//!
//!   1. a single Text frame: the serialized [`SubmissionMetadata`] envelope
//!   2. exactly `total_chunk_count` Binary frames of at most [`CHUNK_SIZE`]
//!      bytes each, in ascending sequence order, no per-chunk acks
//!   3. (inbound, after the last chunk) a Text frame tagged
//!      `message_kind = "evaluation_result"`
//!
//! Renaming a field or changing a constant here is a breaking protocol
//! change. Bump [`PROTOCOL_VERSION`] and update both ends together.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::order::{Material, Process};

// ── Protocol constants ────────────────────────────────────────────────────────

/// Maximum chunk payload size in bytes.
///
/// Not negotiated in-band: both ends compile against this value. A receiver
/// infers nothing from frame sizes except that the final chunk may be short.
pub const CHUNK_SIZE: usize = 65536;

/// Versioned protocol parameter. Revisions that change [`CHUNK_SIZE`] or any
/// envelope field must bump this.
pub const PROTOCOL_VERSION: u32 = 1;

/// Clean closure.
pub const CLOSE_NORMAL: u16 = 1000;

/// Abnormal closure. Existing deployments use this code to signal that the
/// server failed while processing a submitted form; a client observes it as
/// a connection dropped without a close frame. Must be preserved for
/// backward compatibility.
pub const CLOSE_PROCESSING_FAILURE: u16 = 1006;

/// Sent by the server when the envelope fails validation.
pub const CLOSE_INVALID_ENVELOPE: u16 = 1007;

/// Number of chunks a source of `len` bytes splits into.
pub fn chunk_count(len: u64) -> u32 {
    len.div_ceil(CHUNK_SIZE as u64) as u32
}

// ── Envelope ──────────────────────────────────────────────────────────────────

/// The metadata envelope — always the first frame of a submission.
///
/// Immutable once built; owned by the transfer session for the lifetime of
/// one submission attempt. `correlation_id` is generated by the sender and
/// echoed verbatim in the evaluation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionMetadata {
    pub correlation_id: Uuid,
    pub submitter_name: String,
    pub submitter_email: String,
    pub copies_requested: u32,
    pub source_file_name: String,
    pub total_chunk_count: u32,
    pub material_type: Material,
    pub process_type: Process,
}

impl SubmissionMetadata {
    /// Receiver-side sanity check. Senders built through the envelope
    /// builder cannot produce an invalid envelope; foreign clients can.
    pub fn validate(&self) -> Result<(), WireError> {
        if self.submitter_name.trim().is_empty() {
            return Err(WireError::BlankField("submitter_name"));
        }
        if self.submitter_email.trim().is_empty() {
            return Err(WireError::BlankField("submitter_email"));
        }
        if self.source_file_name.trim().is_empty() {
            return Err(WireError::BlankField("source_file_name"));
        }
        if self.copies_requested == 0 {
            return Err(WireError::ZeroCopies);
        }
        if self.total_chunk_count == 0 {
            return Err(WireError::EmptySubmission);
        }
        Ok(())
    }
}

// ── Server messages ───────────────────────────────────────────────────────────

/// Asynchronous price evaluation, pushed by the server on the same
/// connection once every chunk has arrived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub correlation_id: Uuid,
    pub submitter_name: String,
    pub submitter_email: String,
    pub copies_requested: u32,
    pub source_file_name: String,
    pub material_type: Material,
    pub process_type: Process,
    pub computed_price: f64,
}

/// Every inbound Text frame is one of these, dispatched on `message_kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "message_kind", rename_all = "snake_case")]
pub enum ServerMessage {
    EvaluationResult(EvaluationResult),
}

/// Outcome of decoding one inbound Text frame.
///
/// Frames that fail to decode, or carry an unrecognized `message_kind`, map
/// to `Ignored` — unrelated server chatter must never abort an in-flight
/// transfer. Callers log the discard; this function stays pure.
#[derive(Debug)]
pub enum Inbound {
    Evaluation(EvaluationResult),
    Ignored,
}

pub fn decode_server_message(text: &str) -> Inbound {
    match serde_json::from_str::<ServerMessage>(text) {
        Ok(ServerMessage::EvaluationResult(result)) => Inbound::Evaluation(result),
        Err(_) => Inbound::Ignored,
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors that can arise when interpreting wire-format data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("envelope field {0} is missing or blank")]
    BlankField(&'static str),

    #[error("copies_requested must be at least 1")]
    ZeroCopies,

    #[error("total_chunk_count is 0 — empty submissions are rejected before a session starts")]
    EmptySubmission,

    #[error("chunk payload of {got} bytes exceeds the {max}-byte protocol maximum")]
    OversizedChunk { got: usize, max: usize },
}

// ── Tests ─────────────────────────────────────────────────────────────────────
