//! Decision oracle – the scripted ground-truth policy.
//!
//! [`decide`] inspects the pose window, the object list, the dialogue
//! [`Memory`] and its own [`OracleState`] and returns exactly one
//! [`ToolCall`]. The rules form a strict priority cascade; the first branch
//! that fires wins:
//!
//! 1. finish a confirmed motion (pending action);
//! 2. re-ask an unanswered confirmation;
//! 3. re-ask an unanswered candidate question;
//! 4. re-ask an unanswered help offer;
//! 5. confirm the object the user just picked;
//! 6. ask which of two confusable candidates is meant;
//! 7. offer help when the gripper thrashes between two yaws;
//! 8. move toward the intended object;
//! 9. re-confirm once the gripper sits on the goal.
//!
//! The three `awaiting_*` flags are hysteresis latches: once a question is
//! asked the oracle keeps asking it until the user simulator answers and
//! clears the flag. Ids that no longer resolve to an object are cleared and
//! the cascade falls through.

use grasp_types::{
    Cell, GraspError, InteractKind, Memory, Object, Pose, ToolCall, ToolName, Yaw, find_object,
    manhattan_distance, numbered_choices,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::detectors::{YawOscillation, cell_oscillation, top_two_candidates, yaw_oscillation};

/// Choices offered by every yes/no prompt.
pub const YES_NO: [&str; 2] = ["YES", "NO"];

// ─────────────────────────────────────────────────────────────────────────────
// State
// ─────────────────────────────────────────────────────────────────────────────

/// What the last dialogue act asked, so the user simulator can answer it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PromptContext {
    /// "Which one do you want to grasp?" over these labels.
    CandidateQuestion { labels: Vec<String> },
    /// "Do you want me to …?" about one object. `action` is the motion the
    /// question named, when one did.
    Confirm {
        obj_id: String,
        label: String,
        action: Option<ToolName>,
    },
    /// Help offer for a yaw struggle: the two oscillating yaws followed by the
    /// object's own yaw.
    Help { obj_id: String, yaws: (Yaw, Yaw, Yaw) },
}

/// Per-episode decision state, owned by the episode loop and shared with the
/// user simulator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleState {
    /// Object the assistant currently works toward.
    pub intended_obj_id: String,
    /// Object the user just picked, awaiting confirmation.
    pub selected_obj_id: Option<String>,
    /// Confirmed target whose motion is still in progress.
    pub pending_action_obj_id: Option<String>,
    pub awaiting_confirmation: bool,
    pub awaiting_help: bool,
    pub awaiting_choice: bool,
    pub last_prompt_context: Option<PromptContext>,
    /// Object the user most recently said NO to.
    pub last_declined_obj_id: Option<String>,
}

impl OracleState {
    pub fn new(intended_obj_id: impl Into<String>) -> Self {
        Self {
            intended_obj_id: intended_obj_id.into(),
            selected_obj_id: None,
            pending_action_obj_id: None,
            awaiting_confirmation: false,
            awaiting_help: false,
            awaiting_choice: false,
            last_prompt_context: None,
            last_declined_obj_id: None,
        }
    }

    /// `true` while any question is still unanswered.
    pub fn is_awaiting(&self) -> bool {
        self.awaiting_confirmation || self.awaiting_help || self.awaiting_choice
    }

    fn clear_flags(&mut self) {
        self.awaiting_confirmation = false;
        self.awaiting_help = false;
        self.awaiting_choice = false;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Prompt builders
// ─────────────────────────────────────────────────────────────────────────────

fn interact(
    state: &mut OracleState,
    kind: InteractKind,
    text: String,
    choices: Vec<String>,
    context: PromptContext,
) -> ToolCall {
    state.last_prompt_context = Some(context);
    ToolCall::interact(kind, text, choices)
}

fn confirm(state: &mut OracleState, obj: &Object, action: Option<ToolName>) -> ToolCall {
    let text = match action {
        Some(ToolName::AlignYaw) => format!("Do you want me to align yaw to the {}?", obj.label),
        _ => format!("Do you want me to approach the {}?", obj.label),
    };
    let context = PromptContext::Confirm {
        obj_id: obj.id.clone(),
        label: obj.label.clone(),
        action,
    };
    interact(state, InteractKind::Confirm, text, numbered_choices(&YES_NO), context)
}

fn candidate_question(state: &mut OracleState, a: &Object, b: &Object) -> ToolCall {
    let text = format!(
        "I notice you are approaching the {}. However, {} is also close. Which one do you want to grasp?",
        a.label, b.label
    );
    let labels = vec![a.label.clone(), b.label.clone()];
    let choices = numbered_choices(&labels);
    interact(
        state,
        InteractKind::Question,
        text,
        choices,
        PromptContext::CandidateQuestion { labels },
    )
}

fn help_offer(state: &mut OracleState, obj: &Object, osc: YawOscillation) -> ToolCall {
    let text = format!(
        "It looks like you are trying to align to the {} at {}, but the gripper yaw keeps changing \
         ({} and {}) instead of matching the object yaw ({}). Do you want me to help?",
        obj.label, osc.cell, osc.yaw_a, osc.yaw_b, obj.yaw
    );
    let context = PromptContext::Help {
        obj_id: obj.id.clone(),
        yaws: (osc.yaw_a, osc.yaw_b, obj.yaw),
    };
    interact(state, InteractKind::Suggestion, text, numbered_choices(&YES_NO), context)
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Motion still needed to put `pose` on `obj`, if any.
fn next_motion(pose: Pose, obj: &Object) -> Option<ToolName> {
    if pose.cell != obj.cell {
        Some(ToolName::Approach)
    } else if pose.yaw != obj.yaw {
        Some(ToolName::AlignYaw)
    } else {
        None
    }
}

fn motion(name: ToolName, obj: &Object) -> ToolCall {
    let obj = obj.id.clone();
    match name {
        ToolName::AlignYaw => ToolCall::AlignYaw { obj },
        _ => ToolCall::Approach { obj },
    }
}

/// The object a yaw struggle is about, when its yaw lies outside the
/// oscillating pair.
fn struggle_target(objects: &[Object], osc: YawOscillation) -> Option<&Object> {
    objects
        .iter()
        .find(|o| o.cell == osc.cell)
        .filter(|o| o.yaw != osc.yaw_a && o.yaw != osc.yaw_b)
}

fn ambiguous_pair<'a>(
    objects: &'a [Object],
    hist: &[Pose],
    memory: &Memory,
    gripper: Cell,
) -> Option<(&'a Object, &'a Object)> {
    let (a, b) = top_two_candidates(objects, &memory.candidates, gripper)?;
    let just_moved = memory.last_tool() == Some(ToolName::Approach);
    if !just_moved && !cell_oscillation(hist, a.cell, b.cell) {
        return None;
    }
    let da = manhattan_distance(gripper, a.cell);
    let db = manhattan_distance(gripper, b.cell);
    (da.abs_diff(db) <= 1).then_some((a, b))
}

// ─────────────────────────────────────────────────────────────────────────────
// Decision cascade
// ─────────────────────────────────────────────────────────────────────────────

/// Choose the next tool call.
///
/// `hist` is the pose window, oldest first; its last entry is the current
/// pose.
///
/// # Errors
///
/// - [`GraspError::UnknownObject`] – the intended object is not in `objects`.
/// - [`GraspError::InvalidConfig`] – `hist` is empty.
pub fn decide(
    objects: &[Object],
    hist: &[Pose],
    memory: &Memory,
    state: &mut OracleState,
) -> Result<ToolCall, GraspError> {
    let pose = *hist
        .last()
        .ok_or_else(|| GraspError::InvalidConfig("empty pose history".to_string()))?;

    // 1. Pending action resolution.
    if let Some(id) = state.pending_action_obj_id.clone() {
        match find_object(objects, &id) {
            Some(target) => match next_motion(pose, target) {
                Some(name) => return Ok(motion(name, target)),
                None => {
                    debug!(obj = %id, "pending action complete");
                    state.pending_action_obj_id = None;
                    state.selected_obj_id = None;
                    state.clear_flags();
                }
            },
            None => state.pending_action_obj_id = None,
        }
    }

    // 2. Re-prompt while awaiting confirmation.
    if state.awaiting_confirmation {
        let id = state
            .selected_obj_id
            .clone()
            .unwrap_or_else(|| state.intended_obj_id.clone());
        match find_object(objects, &id) {
            Some(obj) => {
                let action = next_motion(pose, obj);
                return Ok(confirm(state, obj, action));
            }
            None => state.awaiting_confirmation = false,
        }
    }

    // 3. Re-prompt while awaiting a candidate choice.
    if state.awaiting_choice {
        match top_two_candidates(objects, &memory.candidates, pose.cell) {
            Some((a, b)) => return Ok(candidate_question(state, a, b)),
            None => state.awaiting_choice = false,
        }
    }

    // 4. Re-prompt while awaiting help acceptance.
    if state.awaiting_help {
        if let Some(osc) = yaw_oscillation(hist)
            && let Some(obj) = struggle_target(objects, osc)
        {
            return Ok(help_offer(state, obj, osc));
        }
        state.awaiting_help = false;
    }

    // 5. Confirm a user-selected object.
    if let Some(id) = state.selected_obj_id.clone() {
        match find_object(objects, &id) {
            Some(obj) => match next_motion(pose, obj) {
                Some(action) => {
                    state.awaiting_confirmation = true;
                    return Ok(confirm(state, obj, Some(action)));
                }
                None => {
                    state.selected_obj_id = None;
                    state.clear_flags();
                }
            },
            None => state.selected_obj_id = None,
        }
    }

    // 6. Spatial ambiguity gate.
    if let Some((a, b)) = ambiguous_pair(objects, hist, memory, pose.cell) {
        debug!(a = %a.id, b = %b.id, "ambiguous candidates");
        state.awaiting_choice = true;
        return Ok(candidate_question(state, a, b));
    }

    // 7. Yaw-struggle suggestion.
    if !state.awaiting_help
        && let Some(osc) = yaw_oscillation(hist)
        && let Some(obj) = struggle_target(objects, osc)
    {
        debug!(obj = %obj.id, cell = %osc.cell, "yaw struggle detected");
        state.awaiting_help = true;
        return Ok(help_offer(state, obj, osc));
    }

    // 8. Default navigation.
    let intended = find_object(objects, &state.intended_obj_id)
        .ok_or_else(|| GraspError::UnknownObject(state.intended_obj_id.clone()))?;
    if let Some(name) = next_motion(pose, intended) {
        return Ok(motion(name, intended));
    }

    // 9. Goal reached: keep confirming until answered.
    state.awaiting_confirmation = true;
    Ok(confirm(state, intended, None))
}
