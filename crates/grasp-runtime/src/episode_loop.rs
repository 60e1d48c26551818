//! [`EpisodeRunner`] – the closed-loop episode driver.
//!
//! Each timestep:
//!
//! 1. **Observe** – refresh the candidate set and snapshot the objects, the
//!    six-pose history window and the dialogue memory.
//! 2. **Decide** – ask the oracle for one [`ToolCall`].
//! 3. **Gatekeep** – pass the assembled [`TrainingRecord`] through the
//!    [`RecordGate`]. A rejected record aborts the episode.
//! 4. **Converse** – log the assistant utterance and let the user simulator
//!    answer.
//! 5. **Act** – apply the tool, then (usually) let the human nudge the
//!    gripper toward the current goal.
//! 6. **Check** – stop early once the gripper sits on the current intended
//!    object with the right yaw.
//!
//! Repeated identical decisions are tracked by a [`LoopGuard`]; a stall is
//! logged and reported in the [`EpisodeOutcome`] but does not change the
//! episode. With the stock [`UserModel`] every latched question is answered
//! on the step it is asked, so stalls only appear with a custom user model
//! or a low `loop_guard_threshold`.
//!
//! # Example
//!
//! ```rust
//! use grasp_runtime::{EpisodeConfig, EpisodeRunner};
//! use grasp_sim::GridWorldBuilder;
//! use grasp_types::{Yaw, ZBand};
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! let mut world = GridWorldBuilder::new(3, 3)
//!     .object("o0", "mug", "C3", Yaw::S)
//!     .hold("A1", Yaw::N, ZBand::High, 6)
//!     .build()
//!     .unwrap();
//!
//! let runner = EpisodeRunner::new(EpisodeConfig::default());
//! let outcome = runner.run(0, &mut world, &mut StdRng::seed_from_u64(1)).unwrap();
//! assert!(outcome.reached_goal);
//! assert_eq!(outcome.records.len() as u32, outcome.steps);
//! ```

use grasp_kernel::RecordGate;
use grasp_sim::Environment;
use grasp_sim::teleop::roll;
use grasp_types::{
    GraspError, HISTORY_WINDOW, Memory, Role, ToolCall, ToolName, TrainingRecord, find_object,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::loop_guard::LoopGuard;
use crate::oracle::{OracleState, decide};
use crate::user_sim::UserModel;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Per-episode loop parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpisodeConfig {
    /// Maximum number of timesteps.
    pub horizon: u32,
    /// Grid distance within which objects count as candidates.
    pub candidate_radius: u32,
    /// Chance the human leaves the gripper alone after an assistant motion.
    pub skip_user_motion_prob: f64,
    /// Identical consecutive decisions that count as a stall.
    pub loop_guard_threshold: usize,
}

impl Default for EpisodeConfig {
    fn default() -> Self {
        Self {
            horizon: 24,
            candidate_radius: 1,
            skip_user_motion_prob: 0.85,
            loop_guard_threshold: 4,
        }
    }
}

/// Result of one episode.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeOutcome {
    pub episode_id: u64,
    pub records: Vec<TrainingRecord>,
    /// Timesteps executed; equals `records.len()`.
    pub steps: u32,
    /// `true` if the episode ended on the intended object's cell and yaw.
    pub reached_goal: bool,
    /// `true` if the loop guard fired at least once.
    pub stalled: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// EpisodeRunner
// ─────────────────────────────────────────────────────────────────────────────

/// Drives the oracle and the user simulator against an [`Environment`].
pub struct EpisodeRunner {
    config: EpisodeConfig,
    user: UserModel,
    gate: RecordGate,
}

impl EpisodeRunner {
    /// Runner with the default user model and the standard record gate.
    pub fn new(config: EpisodeConfig) -> Self {
        Self::with_parts(config, UserModel::default(), RecordGate::default())
    }

    pub fn with_parts(config: EpisodeConfig, user: UserModel, gate: RecordGate) -> Self {
        Self { config, user, gate }
    }

    /// Run one episode to goal or horizon.
    ///
    /// # Errors
    ///
    /// - [`GraspError::Schema`] / [`GraspError::Serialization`] – a record
    ///   was rejected by the gate.
    /// - [`GraspError::UnknownObject`] – the oracle or a tool referenced an
    ///   object the environment does not hold.
    pub fn run<E, R>(
        &self,
        episode_id: u64,
        env: &mut E,
        rng: &mut R,
    ) -> Result<EpisodeOutcome, GraspError>
    where
        E: Environment,
        R: Rng + ?Sized,
    {
        let horizon = self.config.horizon;
        let radius = self.config.candidate_radius;

        let mut state = OracleState::new(env.hidden_intent());
        let mut memory = Memory::new(env.candidates(radius));
        let mut guard = LoopGuard::new(self.config.loop_guard_threshold);

        let mut records = Vec::new();
        let mut reached_goal = false;
        let mut stalled = false;

        for t in 0..horizon {
            // ── Observe ──────────────────────────────────────────────────────
            memory.candidates = env.candidates(radius);
            let objects = env.objects().to_vec();
            let gripper_hist = env.history_window(HISTORY_WINDOW);
            let snapshot = memory.clone();

            // ── Decide ───────────────────────────────────────────────────────
            let call = decide(&objects, &gripper_hist, &memory, &mut state)?;
            debug!(episode_id, t, tool = %call.name(), "oracle decided");

            // ── Gatekeep ─────────────────────────────────────────────────────
            let record = TrainingRecord {
                episode_id,
                t,
                objects,
                gripper_hist,
                memory: snapshot,
                target_tool_call: call.clone(),
            };
            self.gate.admit(&record)?;
            records.push(record);

            if guard.record_call(&call)? && !stalled {
                warn!(
                    episode_id,
                    t,
                    threshold = guard.threshold(),
                    "LoopGuard: oracle repeated the same call"
                );
                stalled = true;
            }

            // ── Converse ─────────────────────────────────────────────────────
            if let ToolCall::Interact(args) = &call {
                memory.n_interactions += 1;
                memory.push_turn(Role::Assistant, args.text.clone());
            }
            self.user.respond(rng, &call, &*env, &mut memory, &mut state);
            memory.push_tool(call.name());

            // ── Act ──────────────────────────────────────────────────────────
            env.apply_tool(&call)?;
            if t + 1 < horizon {
                let skip = call.name() != ToolName::Interact
                    && roll(rng, self.config.skip_user_motion_prob);
                if !skip {
                    env.apply_user_motion(&state.intended_obj_id, rng)?;
                }
            }

            // ── Check ────────────────────────────────────────────────────────
            let intended = find_object(env.objects(), &state.intended_obj_id)
                .ok_or_else(|| GraspError::UnknownObject(state.intended_obj_id.clone()))?;
            let pose = env.current_pose();
            if pose.cell == intended.cell && pose.yaw == intended.yaw {
                reached_goal = true;
                break;
            }
        }

        let steps = records.len() as u32;
        info!(episode_id, steps, reached_goal, stalled, "episode finished");
        Ok(EpisodeOutcome {
            episode_id,
            records,
            steps,
            reached_goal,
            stalled,
        })
    }
}
