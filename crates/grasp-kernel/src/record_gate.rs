//! [`RecordGate`] – single interception point between the episode loop and
//! the dataset writer.
//!
//! Every [`TrainingRecord`] assembled by `grasp-runtime` is serialised to
//! JSON and run through a [`SchemaVerifier`] before it is accepted. A record
//! that fails any rule is never written; the loop aborts with the
//! [`GraspError::Schema`] returned here.
//!
//! # Example
//!
//! ```
//! use grasp_kernel::RecordGate;
//! use grasp_types::ToolCall;
//!
//! let gate = RecordGate::default();
//! assert!(gate.check_tool_call(&ToolCall::Approach { obj: "o1".into() }).is_ok());
//!
//! let empty = ToolCall::interact(grasp_types::InteractKind::Question, "Which?", vec![]);
//! assert!(gate.check_tool_call(&empty).is_err());
//! ```

use grasp_types::{GraspError, ToolCall, TrainingRecord};
use serde_json::Value;
use tracing::warn;

use crate::schema_verifier::{SchemaVerifier, validate_tool_call};

/// The gateway every record passes through before it is kept.
pub struct RecordGate {
    verifier: SchemaVerifier,
}

impl Default for RecordGate {
    /// A gate backed by [`SchemaVerifier::standard`].
    fn default() -> Self {
        Self::new(SchemaVerifier::standard())
    }
}

impl RecordGate {
    pub fn new(verifier: SchemaVerifier) -> Self {
        Self { verifier }
    }

    pub fn verifier(&self) -> &SchemaVerifier {
        &self.verifier
    }

    /// Serialise `record` and validate it against every registered rule.
    ///
    /// # Errors
    ///
    /// - [`GraspError::Serialization`] – the record could not be encoded.
    /// - [`GraspError::Schema`] – a rule was violated.
    pub fn admit(&self, record: &TrainingRecord) -> Result<Value, GraspError> {
        let value =
            serde_json::to_value(record).map_err(|e| GraspError::Serialization(e.to_string()))?;
        self.admit_value(&value).inspect_err(|e| {
            warn!(episode_id = record.episode_id, t = record.t, error = %e, "record rejected");
        })?;
        Ok(value)
    }

    /// Validate an already-encoded record, e.g. one read back from disk.
    pub fn admit_value(&self, value: &Value) -> Result<(), GraspError> {
        self.verifier.verify(value)
    }

    /// Validate the wire shape of a single tool call.
    pub fn check_tool_call(&self, call: &ToolCall) -> Result<(), GraspError> {
        let value =
            serde_json::to_value(call).map_err(|e| GraspError::Serialization(e.to_string()))?;
        validate_tool_call(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grasp_types::{Cell, InteractKind, Memory, Object, Pose, Yaw, ZBand, numbered_choices};

    fn record(hist_len: usize, call: ToolCall) -> TrainingRecord {
        let pose = Pose::new(Cell::new(0, 0), Yaw::N, ZBand::High);
        TrainingRecord {
            episode_id: 4,
            t: 0,
            objects: vec![Object {
                id: "o0".into(),
                label: "mug".into(),
                cell: Cell::new(1, 1),
                yaw: Yaw::E,
                is_held: false,
            }],
            gripper_hist: vec![pose; hist_len],
            memory: Memory::new(vec!["o0".into()]),
            target_tool_call: call,
        }
    }

    #[test]
    fn well_formed_record_is_admitted() {
        let gate = RecordGate::default();
        let value = gate
            .admit(&record(6, ToolCall::Approach { obj: "o0".into() }))
            .unwrap();
        assert_eq!(value["target_tool_call"]["tool"], "APPROACH");
        assert_eq!(value["gripper_hist"].as_array().unwrap().len(), 6);
    }

    #[test]
    fn short_history_is_rejected() {
        let gate = RecordGate::default();
        let err = gate
            .admit(&record(4, ToolCall::AlignYaw { obj: "o0".into() }))
            .unwrap_err();
        assert!(matches!(err, GraspError::Schema(_)));
    }

    #[test]
    fn interact_without_choices_is_rejected() {
        let gate = RecordGate::default();
        let call = ToolCall::interact(InteractKind::Suggestion, "Help?", vec![]);
        assert!(gate.admit(&record(6, call)).is_err());
    }

    #[test]
    fn numbered_interact_is_admitted() {
        let gate = RecordGate::default();
        let call = ToolCall::interact(
            InteractKind::Question,
            "Which one do you want to grasp?",
            numbered_choices(&["mug", "apple"]),
        );
        assert!(gate.check_tool_call(&call).is_ok());
        assert!(gate.admit(&record(6, call)).is_ok());
    }

    #[test]
    fn empty_verifier_admits_everything() {
        let gate = RecordGate::new(SchemaVerifier::new());
        assert!(gate.admit(&record(1, ToolCall::Approach { obj: "o0".into() })).is_ok());
        assert!(gate.verifier().rule_names().is_empty());
    }
}
