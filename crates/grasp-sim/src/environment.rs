//! The environment contract consumed by the episode loop.
//!
//! The loop never touches grid internals; it only asks for the current pose,
//! the recent pose history, the object list and the candidate set, and it
//! hands tool calls and teleoperation nudges back. [`GridWorld`] is the
//! in-tree implementation.
//!
//! [`GridWorld`]: crate::world::GridWorld

use grasp_types::{GraspError, Object, Pose, ToolCall, manhattan_distance};
use rand::Rng;

/// A scene hosting one episode.
pub trait Environment {
    /// Pose of the gripper right now.
    fn current_pose(&self) -> Pose;

    /// Every pose recorded so far, oldest first. Never empty.
    fn pose_history(&self) -> &[Pose];

    /// Objects in a stable order.
    fn objects(&self) -> &[Object];

    /// Id of the object the simulated human secretly wants, fixed at
    /// creation.
    fn hidden_intent(&self) -> &str;

    /// Execute a tool call. Motion tools move the gripper; `INTERACT` is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// [`GraspError::UnknownObject`] when a motion call names an object that
    /// is not in the scene.
    fn apply_tool(&mut self, call: &ToolCall) -> Result<(), GraspError>;

    /// Let the simulated human nudge the gripper one step toward
    /// `target_id`.
    ///
    /// # Errors
    ///
    /// [`GraspError::UnknownObject`] when `target_id` is not in the scene.
    fn apply_user_motion<R: Rng + ?Sized>(
        &mut self,
        target_id: &str,
        rng: &mut R,
    ) -> Result<(), GraspError>;

    /// Ids of objects whose cell lies within `max_distance` grid steps of the
    /// gripper, in object order.
    fn candidates(&self, max_distance: u32) -> Vec<String> {
        let cell = self.current_pose().cell;
        self.objects()
            .iter()
            .filter(|o| manhattan_distance(cell, o.cell) <= max_distance)
            .map(|o| o.id.clone())
            .collect()
    }

    /// The trailing `n` poses, oldest first. Shorter histories are padded at
    /// the front with the oldest recorded pose so the result always has
    /// exactly `n` entries.
    fn history_window(&self, n: usize) -> Vec<Pose> {
        let hist = self.pose_history();
        let tail = &hist[hist.len().saturating_sub(n)..];
        let mut window = Vec::with_capacity(n);
        if let Some(oldest) = hist.first() {
            window.extend(std::iter::repeat_n(*oldest, n - tail.len()));
        }
        window.extend_from_slice(tail);
        window
    }
}
