//! `grasp-types` – shared vocabulary of the grasp-copilot workspace.
//!
//! Every crate in the workspace speaks in terms of the types defined here:
//! grid [`Cell`]s, discrete [`Yaw`] bins and [`ZBand`]s that make up a gripper
//! [`Pose`], the scene [`Object`]s, the three-way [`ToolCall`] union the
//! decision oracle emits, the cross-timestep [`Memory`] log, and the
//! [`TrainingRecord`] written to disk.
//!
//! # Wire shape
//!
//! A tool call always serialises as exactly two keys:
//!
//! ```rust
//! use grasp_types::ToolCall;
//!
//! let call = ToolCall::Approach { obj: "o1".to_string() };
//! let json = serde_json::to_string(&call).unwrap();
//! assert_eq!(json, r#"{"tool":"APPROACH","args":{"obj":"o1"}}"#);
//! ```

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of poses carried in every record's `gripper_hist`.
pub const HISTORY_WINDOW: usize = 6;

/// Number of executed tool names retained in [`Memory::last_tool_calls`].
pub const LAST_TOOL_WINDOW: usize = 3;

// ─────────────────────────────────────────────────────────────────────────────
// Geometry
// ─────────────────────────────────────────────────────────────────────────────

/// A discrete grid coordinate.
///
/// Serialised as a row letter followed by a 1-based column number, so
/// `Cell { row: 1, col: 1 }` is `"B2"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cell {
    pub row: u8,
    pub col: u8,
}

impl Cell {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'A' + self.row) as char, u16::from(self.col) + 1)
    }
}

impl FromStr for Cell {
    type Err = GraspError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let row = match chars.next() {
            Some(c) if c.is_ascii_uppercase() => c as u8 - b'A',
            _ => return Err(GraspError::InvalidCell(s.to_string())),
        };
        let col: u16 = chars
            .as_str()
            .parse()
            .map_err(|_| GraspError::InvalidCell(s.to_string()))?;
        if col == 0 || col > u16::from(u8::MAX) {
            return Err(GraspError::InvalidCell(s.to_string()));
        }
        Ok(Cell::new(row, (col - 1) as u8))
    }
}

impl TryFrom<String> for Cell {
    type Error = GraspError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Cell> for String {
    fn from(cell: Cell) -> Self {
        cell.to_string()
    }
}

/// Sum of absolute row and column deltas between two cells.
pub fn manhattan_distance(a: Cell, b: Cell) -> u32 {
    u32::from(a.row.abs_diff(b.row)) + u32::from(a.col.abs_diff(b.col))
}

/// Discrete gripper/object orientation bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Yaw {
    N,
    E,
    S,
    W,
}

impl Yaw {
    /// All bins in clockwise order starting at north.
    pub const ALL: [Yaw; 4] = [Yaw::N, Yaw::E, Yaw::S, Yaw::W];

    fn index(self) -> usize {
        match self {
            Yaw::N => 0,
            Yaw::E => 1,
            Yaw::S => 2,
            Yaw::W => 3,
        }
    }

    /// Rotate one bin toward `target` along the shorter direction
    /// (clockwise when both directions are equally long).
    pub fn step_toward(self, target: Yaw) -> Yaw {
        let n = Self::ALL.len();
        let diff = (target.index() + n - self.index()) % n;
        match diff {
            0 => self,
            d if d <= n / 2 => Self::ALL[(self.index() + 1) % n],
            _ => Self::ALL[(self.index() + n - 1) % n],
        }
    }
}

impl fmt::Display for Yaw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Yaw::N => "N",
            Yaw::E => "E",
            Yaw::S => "S",
            Yaw::W => "W",
        };
        f.write_str(s)
    }
}

/// Discrete gripper height band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ZBand {
    High,
    Mid,
    Low,
}

/// One snapshot of the gripper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pose {
    pub cell: Cell,
    pub yaw: Yaw,
    pub z: ZBand,
}

impl Pose {
    pub fn new(cell: Cell, yaw: Yaw, z: ZBand) -> Self {
        Self { cell, yaw, z }
    }
}

/// A graspable object in the scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Object {
    pub id: String,
    pub label: String,
    pub cell: Cell,
    pub yaw: Yaw,
    pub is_held: bool,
}

/// Look up an object by id.
pub fn find_object<'a>(objects: &'a [Object], id: &str) -> Option<&'a Object> {
    objects.iter().find(|o| o.id == id)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool calls
// ─────────────────────────────────────────────────────────────────────────────

/// Name of a tool, as stored in [`Memory::last_tool_calls`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolName {
    Interact,
    Approach,
    AlignYaw,
}

impl ToolName {
    pub const ALL: [ToolName; 3] = [ToolName::Interact, ToolName::Approach, ToolName::AlignYaw];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::Interact => "INTERACT",
            ToolName::Approach => "APPROACH",
            ToolName::AlignYaw => "ALIGN_YAW",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semantic class of a dialogue act.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InteractKind {
    Question,
    Suggestion,
    Confirm,
}

impl InteractKind {
    pub const ALL: [InteractKind; 3] =
        [InteractKind::Question, InteractKind::Suggestion, InteractKind::Confirm];

    pub fn as_str(self) -> &'static str {
        match self {
            InteractKind::Question => "QUESTION",
            InteractKind::Suggestion => "SUGGESTION",
            InteractKind::Confirm => "CONFIRM",
        }
    }
}

/// Arguments of an `INTERACT` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct InteractArgs {
    pub kind: InteractKind,
    pub text: String,
    /// Numbered options, each of the form `"N) label"`.
    pub choices: Vec<String>,
}

/// The single action the oracle emits per timestep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "tool", content = "args", deny_unknown_fields)]
pub enum ToolCall {
    /// Dialogue act: question, suggestion, or confirmation.
    #[serde(rename = "INTERACT")]
    Interact(InteractArgs),
    /// Move the gripper onto the object's cell.
    #[serde(rename = "APPROACH")]
    Approach { obj: String },
    /// Rotate the gripper to the object's yaw.
    #[serde(rename = "ALIGN_YAW")]
    AlignYaw { obj: String },
}

impl ToolCall {
    pub fn interact(kind: InteractKind, text: impl Into<String>, choices: Vec<String>) -> Self {
        ToolCall::Interact(InteractArgs {
            kind,
            text: text.into(),
            choices,
        })
    }

    pub fn name(&self) -> ToolName {
        match self {
            ToolCall::Interact(_) => ToolName::Interact,
            ToolCall::Approach { .. } => ToolName::Approach,
            ToolCall::AlignYaw { .. } => ToolName::AlignYaw,
        }
    }

    /// The object a motion call targets; `None` for `INTERACT`.
    pub fn target(&self) -> Option<&str> {
        match self {
            ToolCall::Interact(_) => None,
            ToolCall::Approach { obj } | ToolCall::AlignYaw { obj } => Some(obj),
        }
    }

    pub fn as_interact(&self) -> Option<&InteractArgs> {
        match self {
            ToolCall::Interact(args) => Some(args),
            _ => None,
        }
    }
}

/// Number `labels` as `"1) a"`, `"2) b"`, …
pub fn numbered_choices<S: AsRef<str>>(labels: &[S]) -> Vec<String> {
    labels
        .iter()
        .enumerate()
        .map(|(i, label)| format!("{}) {}", i + 1, label.as_ref()))
        .collect()
}

/// Strip the `"N) "` prefix from a numbered choice.
pub fn choice_label(choice: &str) -> &str {
    match choice.split_once(')') {
        Some((_, rest)) => rest.trim(),
        None => choice.trim(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory
// ─────────────────────────────────────────────────────────────────────────────

/// Speaker of a dialog turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Assistant,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogTurn {
    pub role: Role,
    pub content: String,
}

/// Log carried across the timesteps of one episode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    pub n_interactions: u32,
    pub past_dialogs: Vec<DialogTurn>,
    /// Ids of objects within the candidate radius of the gripper.
    pub candidates: Vec<String>,
    /// Most-recent-last window of executed tool names.
    pub last_tool_calls: Vec<ToolName>,
}

impl Memory {
    pub fn new(candidates: Vec<String>) -> Self {
        Self {
            candidates,
            ..Self::default()
        }
    }

    pub fn push_turn(&mut self, role: Role, content: impl Into<String>) {
        self.past_dialogs.push(DialogTurn {
            role,
            content: content.into(),
        });
    }

    /// Record an executed tool, keeping only the last [`LAST_TOOL_WINDOW`].
    pub fn push_tool(&mut self, name: ToolName) {
        self.last_tool_calls.push(name);
        if self.last_tool_calls.len() > LAST_TOOL_WINDOW {
            let excess = self.last_tool_calls.len() - LAST_TOOL_WINDOW;
            self.last_tool_calls.drain(..excess);
        }
    }

    pub fn last_tool(&self) -> Option<ToolName> {
        self.last_tool_calls.last().copied()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Records
// ─────────────────────────────────────────────────────────────────────────────

/// One supervised example: the pre-decision snapshot paired with the
/// oracle's decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub episode_id: u64,
    pub t: u32,
    pub objects: Vec<Object>,
    pub gripper_hist: Vec<Pose>,
    pub memory: Memory,
    pub target_tool_call: ToolCall,
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Workspace-wide error type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraspError {
    #[error("Schema violation: {0}")]
    Schema(String),

    #[error("Unknown object id: {0}")]
    UnknownObject(String),

    #[error("Invalid cell: {0:?}")]
    InvalidCell(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}
