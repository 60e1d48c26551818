//! `grasp-kernel` – record admission.
//!
//! Nothing reaches a dataset file without passing through here. The kernel
//! does not generate anything; it enforces the wire contract that downstream
//! learners rely on and fails loudly when it is broken.
//!
//! # Modules
//!
//! - [`schema_verifier`] – [`SchemaVerifier`][schema_verifier::SchemaVerifier]:
//!   an ordered rule engine over the JSON form of a record, with built-in
//!   rules for the required top-level keys, the fixed-width pose history and
//!   the tool-call shape.
//! - [`record_gate`] – [`RecordGate`][record_gate::RecordGate]: the single
//!   interception point the episode loop passes every freshly assembled
//!   [`TrainingRecord`][grasp_types::TrainingRecord] through before it is
//!   accepted.

pub mod record_gate;
pub mod schema_verifier;

pub use record_gate::RecordGate;
pub use schema_verifier::{
    HistoryLengthRule, RequiredKeysRule, Rule, SchemaVerifier, ToolCallRule, validate_tool_call,
};
