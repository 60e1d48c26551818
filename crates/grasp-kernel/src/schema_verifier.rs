//! [`SchemaVerifier`] – wire-contract rule engine.
//!
//! Rules run against the JSON form of a record rather than the typed
//! structs, so the checks see exactly what will be written to disk: key sets,
//! value types and string formats. Every registered [`Rule`] is evaluated in
//! order; the first violation returns a [`GraspError::Schema`].
//!
//! Three built-in rules are provided:
//! - [`RequiredKeysRule`] – the six top-level record keys are present with
//!   the right JSON types.
//! - [`HistoryLengthRule`] – `gripper_hist` holds exactly the expected number
//!   of poses.
//! - [`ToolCallRule`] – `target_tool_call` satisfies [`validate_tool_call`].

use grasp_types::{GraspError, HISTORY_WINDOW};
use serde_json::{Map, Value};

// ────────────────────────────────────────────────────────────────────────────
// Rule trait
// ────────────────────────────────────────────────────────────────────────────

/// A single structural invariant a record must satisfy.
pub trait Rule: Send + Sync {
    /// Name used in violation messages.
    fn name(&self) -> &str;

    /// Return `Ok(())` when `record` satisfies the invariant, or
    /// [`GraspError::Schema`] when it does not.
    fn check(&self, record: &Value) -> Result<(), GraspError>;
}

// ────────────────────────────────────────────────────────────────────────────
// SchemaVerifier
// ────────────────────────────────────────────────────────────────────────────

/// Ordered collection of [`Rule`]s.
///
/// # Example
///
/// ```
/// use grasp_kernel::schema_verifier::{SchemaVerifier, ToolCallRule};
/// use serde_json::json;
///
/// let mut verifier = SchemaVerifier::new();
/// verifier.add_rule(Box::new(ToolCallRule));
///
/// let ok = json!({"target_tool_call": {"tool": "APPROACH", "args": {"obj": "o1"}}});
/// assert!(verifier.verify(&ok).is_ok());
///
/// let bad = json!({"target_tool_call": {"tool": "GRASP", "args": {}}});
/// assert!(verifier.verify(&bad).is_err());
/// ```
#[derive(Default)]
pub struct SchemaVerifier {
    rules: Vec<Box<dyn Rule>>,
}

impl SchemaVerifier {
    /// Create an empty verifier with no rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Verifier loaded with every built-in rule, in the order keys → history
    /// → tool call.
    pub fn standard() -> Self {
        let mut v = Self::new();
        v.add_rule(Box::new(RequiredKeysRule));
        v.add_rule(Box::new(HistoryLengthRule {
            expected: HISTORY_WINDOW,
        }));
        v.add_rule(Box::new(ToolCallRule));
        v
    }

    /// Register a new [`Rule`]. Rules are evaluated in insertion order.
    pub fn add_rule(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Validate `record` against every registered rule, returning the first
    /// violation.
    pub fn verify(&self, record: &Value) -> Result<(), GraspError> {
        for rule in &self.rules {
            rule.check(record)?;
        }
        Ok(())
    }
}

fn violation(msg: impl Into<String>) -> GraspError {
    GraspError::Schema(msg.into())
}

fn exact_keys(map: &Map<String, Value>, keys: &[&str]) -> bool {
    map.len() == keys.len() && keys.iter().all(|k| map.contains_key(*k))
}

// ────────────────────────────────────────────────────────────────────────────
// Tool-call validation
// ────────────────────────────────────────────────────────────────────────────

/// `true` for `"<digits>)..."`.
fn has_numbered_prefix(choice: &str) -> bool {
    match choice.split_once(')') {
        Some((prefix, _)) => !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

/// Validate the JSON shape of a single tool call.
///
/// # Errors
///
/// [`GraspError::Schema`] describing the first violated constraint.
pub fn validate_tool_call(call: &Value) -> Result<(), GraspError> {
    let obj = match call.as_object() {
        Some(o) if exact_keys(o, &["tool", "args"]) => o,
        _ => return Err(violation("tool call must be exactly {tool, args}")),
    };
    let args = obj["args"]
        .as_object()
        .ok_or_else(|| violation("args must be an object"))?;

    match obj["tool"].as_str() {
        Some("INTERACT") => {
            if !exact_keys(args, &["kind", "text", "choices"]) {
                return Err(violation("INTERACT args must be exactly {kind, text, choices}"));
            }
            match args["kind"].as_str() {
                Some("QUESTION" | "SUGGESTION" | "CONFIRM") => {}
                _ => return Err(violation("invalid INTERACT.kind")),
            }
            if !args["text"].is_string() {
                return Err(violation("INTERACT.text must be a string"));
            }
            let choices = match args["choices"].as_array() {
                Some(c) if !c.is_empty() => c,
                _ => return Err(violation("INTERACT.choices must be a non-empty array")),
            };
            for choice in choices {
                let s = choice
                    .as_str()
                    .ok_or_else(|| violation("INTERACT.choices must contain only strings"))?;
                if !has_numbered_prefix(s) {
                    return Err(violation(format!(
                        "choice {s:?} must start with a numbered prefix like '1)'"
                    )));
                }
            }
            Ok(())
        }
        Some(tool @ ("APPROACH" | "ALIGN_YAW")) => {
            if exact_keys(args, &["obj"]) && args["obj"].is_string() {
                Ok(())
            } else {
                Err(violation(format!("{tool} args must be exactly {{obj: string}}")))
            }
        }
        Some(other) => Err(violation(format!("invalid tool: {other}"))),
        None => Err(violation("tool must be a string")),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Built-in rules
// ────────────────────────────────────────────────────────────────────────────

/// Requires the six record keys with their JSON types.
pub struct RequiredKeysRule;

impl Rule for RequiredKeysRule {
    fn name(&self) -> &str {
        "required_keys"
    }

    fn check(&self, record: &Value) -> Result<(), GraspError> {
        let obj = record
            .as_object()
            .ok_or_else(|| violation("record must be a JSON object"))?;
        let typed: [(&str, fn(&Value) -> bool); 6] = [
            ("episode_id", Value::is_u64),
            ("t", Value::is_u64),
            ("objects", Value::is_array),
            ("gripper_hist", Value::is_array),
            ("memory", Value::is_object),
            ("target_tool_call", Value::is_object),
        ];
        for (key, is_type) in typed {
            match obj.get(key) {
                None => return Err(violation(format!("missing key: {key}"))),
                Some(v) if !is_type(v) => {
                    return Err(violation(format!("key {key} has the wrong type")));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// Requires `gripper_hist` to hold exactly `expected` entries.
pub struct HistoryLengthRule {
    pub expected: usize,
}

impl Rule for HistoryLengthRule {
    fn name(&self) -> &str {
        "history_length"
    }

    fn check(&self, record: &Value) -> Result<(), GraspError> {
        let len = record
            .get("gripper_hist")
            .and_then(Value::as_array)
            .map(Vec::len)
            .ok_or_else(|| violation("gripper_hist must be an array"))?;
        if len != self.expected {
            return Err(violation(format!(
                "gripper_hist must have length {}, got {len}",
                self.expected
            )));
        }
        Ok(())
    }
}

/// Applies [`validate_tool_call`] to `target_tool_call`.
pub struct ToolCallRule;

impl Rule for ToolCallRule {
    fn name(&self) -> &str {
        "tool_call"
    }

    fn check(&self, record: &Value) -> Result<(), GraspError> {
        let call = record
            .get("target_tool_call")
            .ok_or_else(|| violation("missing key: target_tool_call"))?;
        validate_tool_call(call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn interact(choices: Value) -> Value {
        json!({"tool": "INTERACT", "args": {"kind": "QUESTION", "text": "Which one?", "choices": choices}})
    }

    fn record(hist_len: usize) -> Value {
        let pose = json!({"cell": "A1", "yaw": "N", "z": "HIGH"});
        let hist = vec![pose; hist_len];
        json!({
            "episode_id": 0,
            "t": 3,
            "objects": [],
            "gripper_hist": hist,
            "memory": {"n_interactions": 0, "past_dialogs": [], "candidates": [], "last_tool_calls": []},
            "target_tool_call": {"tool": "ALIGN_YAW", "args": {"obj": "o0"}},
        })
    }

    // ------------------------------------------------------------------ tool calls

    #[test]
    fn well_formed_calls_pass() {
        assert!(validate_tool_call(&interact(json!(["1) mug", "2) apple"]))).is_ok());
        assert!(validate_tool_call(&json!({"tool": "APPROACH", "args": {"obj": "o1"}})).is_ok());
        assert!(validate_tool_call(&json!({"tool": "ALIGN_YAW", "args": {"obj": "o1"}})).is_ok());
    }

    #[test]
    fn extra_top_level_key_is_rejected() {
        let call = json!({"tool": "APPROACH", "args": {"obj": "o1"}, "why": "close"});
        assert!(validate_tool_call(&call).is_err());
    }

    #[test]
    fn unknown_tool_is_rejected() {
        let err = validate_tool_call(&json!({"tool": "GRASP", "args": {"obj": "o1"}})).unwrap_err();
        assert!(err.to_string().contains("invalid tool"));
    }

    #[test]
    fn motion_args_must_be_exactly_obj() {
        assert!(validate_tool_call(&json!({"tool": "APPROACH", "args": {}})).is_err());
        assert!(validate_tool_call(&json!({"tool": "APPROACH", "args": {"obj": 1}})).is_err());
        assert!(
            validate_tool_call(&json!({"tool": "ALIGN_YAW", "args": {"obj": "o1", "yaw": "N"}}))
                .is_err()
        );
    }

    #[test]
    fn interact_kind_must_be_known() {
        let call = json!({"tool": "INTERACT", "args": {"kind": "NOTIFY", "text": "hi", "choices": ["1) ok"]}});
        assert!(validate_tool_call(&call).is_err());
    }

    #[test]
    fn choices_need_numbered_prefixes() {
        assert!(validate_tool_call(&interact(json!([]))).is_err());
        assert!(validate_tool_call(&interact(json!(["mug"]))).is_err());
        assert!(validate_tool_call(&interact(json!(["a) mug"]))).is_err());
        assert!(validate_tool_call(&interact(json!([") mug"]))).is_err());
        assert!(validate_tool_call(&interact(json!(["1) mug", 2]))).is_err());
        assert!(validate_tool_call(&interact(json!(["10) mug"]))).is_ok());
    }

    // ------------------------------------------------------------------ record rules

    #[test]
    fn standard_verifier_accepts_well_formed_record() {
        let v = SchemaVerifier::standard();
        assert_eq!(v.rule_names(), vec!["required_keys", "history_length", "tool_call"]);
        assert!(v.verify(&record(6)).is_ok());
    }

    #[test]
    fn wrong_history_length_is_rejected() {
        let err = SchemaVerifier::standard().verify(&record(5)).unwrap_err();
        assert!(err.to_string().contains("length 6"));
    }

    #[test]
    fn missing_key_is_rejected() {
        let mut rec = record(6);
        rec.as_object_mut().unwrap().remove("memory");
        let err = SchemaVerifier::standard().verify(&rec).unwrap_err();
        assert!(err.to_string().contains("missing key: memory"));
    }

    #[test]
    fn negative_step_index_is_rejected() {
        let mut rec = record(6);
        rec["t"] = json!(-1);
        assert!(SchemaVerifier::standard().verify(&rec).is_err());
    }

    #[test]
    fn empty_verifier_accepts_anything() {
        assert!(SchemaVerifier::new().verify(&json!(null)).is_ok());
    }
}
