//! Inbound demultiplexing — routes evaluation results back to the session.

use uuid::Uuid;

use platen_core::wire::{decode_server_message, EvaluationResult, Inbound};

/// Demultiplexes inbound frames for one session.
///
/// One correlator per connection, the session is its only listener —
/// concurrent submissions each own their own connection, so no shared
/// dispatch registry exists. Frames that are malformed, unrecognized, or
/// addressed to a different submission are logged and dropped; they never
/// fail the session.
#[derive(Debug, Clone)]
pub struct ResponseCorrelator {
    correlation_id: Uuid,
}

impl ResponseCorrelator {
    pub fn new(correlation_id: Uuid) -> Self {
        Self { correlation_id }
    }

    /// Inspect one inbound Text frame. Returns the evaluation iff it
    /// belongs to this session.
    pub fn accept(&self, text: &str) -> Option<EvaluationResult> {
        match decode_server_message(text) {
            Inbound::Evaluation(result) if result.correlation_id == self.correlation_id => {
                tracing::debug!(
                    correlation_id = %result.correlation_id,
                    price = result.computed_price,
                    "evaluation result received"
                );
                Some(result)
            }
            Inbound::Evaluation(result) => {
                // Stale result from an earlier attempt on a reused endpoint.
                tracing::warn!(
                    got = %result.correlation_id,
                    want = %self.correlation_id,
                    "evaluation for a different submission, ignoring"
                );
                None
            }
            Inbound::Ignored => {
                tracing::debug!(len = text.len(), "unrecognized inbound frame, ignoring");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platen_core::order::{Material, Process};
    use platen_core::wire::ServerMessage;

    fn result_for(id: Uuid) -> String {
        serde_json::to_string(&ServerMessage::EvaluationResult(EvaluationResult {
            correlation_id: id,
            submitter_name: "Ada".into(),
            submitter_email: "ada@example.org".into(),
            copies_requested: 1,
            source_file_name: "bracket.stl".into(),
            material_type: Material::PLA,
            process_type: Process::Standard,
            computed_price: 42.50,
        }))
        .unwrap()
    }

    #[test]
    fn matching_result_is_delivered() {
        let id = Uuid::new_v4();
        let correlator = ResponseCorrelator::new(id);
        let result = correlator.accept(&result_for(id)).expect("should deliver");
        assert_eq!(result.computed_price, 42.50);
    }

    #[test]
    fn mismatched_correlation_id_is_dropped() {
        let correlator = ResponseCorrelator::new(Uuid::new_v4());
        assert!(correlator.accept(&result_for(Uuid::new_v4())).is_none());
    }

    #[test]
    fn unrecognized_and_malformed_frames_are_dropped_without_panic() {
        let correlator = ResponseCorrelator::new(Uuid::new_v4());
        assert!(correlator.accept(r#"{"message_kind":"server_gossip"}"#).is_none());
        assert!(correlator.accept("????").is_none());
        assert!(correlator.accept("").is_none());
    }
}
