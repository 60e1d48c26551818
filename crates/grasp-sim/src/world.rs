//! [`GridWorld`] – randomly generated tabletop scene.
//!
//! A world is a `rows × cols` grid holding between two and `max_objects`
//! objects on distinct cells, each with a unique label from
//! [`OBJECT_LABELS`] and a random yaw. One object is secretly the human's
//! goal. The gripper starts at least two steps away from it and is driven
//! for a few teleoperation steps before the episode begins so that the pose
//! history is already populated. Those steps never reach the goal cell.
//!
//! # Example
//!
//! ```rust
//! use grasp_sim::{Environment, GridWorld, WorldConfig};
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let world = GridWorld::generate(&mut rng, &WorldConfig::default()).unwrap();
//! assert!(world.objects().len() >= 2);
//! assert_eq!(world.pose_history().len(), WorldConfig::default().prehistory);
//! ```

use grasp_types::{Cell, GraspError, Object, Pose, ToolCall, Yaw, ZBand, find_object, manhattan_distance};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::environment::Environment;
use crate::teleop::{Teleop, band_for, neighbours, roll};

/// Closed vocabulary of object labels (YCB-style household items).
pub const OBJECT_LABELS: [&str; 10] = [
    "mug",
    "sugar_box",
    "tuna_fish_can",
    "cracker_box",
    "banana",
    "apple",
    "mustard_bottle",
    "tomato_soup_can",
    "bleach_cleanser",
    "power_drill",
];

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Scene generation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub rows: u8,
    pub cols: u8,
    /// Upper bound on objects per scene (also capped by the label vocabulary
    /// and the number of cells).
    pub max_objects: usize,
    /// Number of poses recorded before the first decision.
    pub prehistory: usize,
    /// Probability that a travelling human steps to a random neighbour.
    pub wander_prob: f64,
    /// Probability that an episode's human struggles with yaw alignment.
    pub struggle_prob: f64,
    /// Probability that one non-goal object starts out held.
    pub held_distractor_prob: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            rows: 5,
            cols: 5,
            max_objects: 10,
            prehistory: 6,
            wander_prob: 0.2,
            struggle_prob: 0.35,
            held_distractor_prob: 0.1,
        }
    }
}

impl WorldConfig {
    fn validate(&self) -> Result<(), GraspError> {
        if !(1..=26).contains(&self.rows) || self.cols == 0 {
            return Err(GraspError::InvalidConfig(format!(
                "grid must be 1..=26 rows and at least one column, got {}x{}",
                self.rows, self.cols
            )));
        }
        if usize::from(self.rows) * usize::from(self.cols) < 2 || self.max_objects < 2 {
            return Err(GraspError::InvalidConfig(
                "a scene needs room for at least two objects".to_string(),
            ));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// GridWorld
// ─────────────────────────────────────────────────────────────────────────────

/// A rectangular tabletop with objects, a gripper and a hidden goal.
#[derive(Debug, Clone)]
pub struct GridWorld {
    rows: u8,
    cols: u8,
    objects: Vec<Object>,
    history: Vec<Pose>,
    hidden_intent: String,
    teleop: Teleop,
}

impl GridWorld {
    /// Assemble a world from explicit parts. `history` must not be empty and
    /// `hidden_intent` must name one of `objects`.
    pub(crate) fn from_parts(
        rows: u8,
        cols: u8,
        objects: Vec<Object>,
        history: Vec<Pose>,
        hidden_intent: String,
        teleop: Teleop,
    ) -> Result<Self, GraspError> {
        if history.is_empty() {
            return Err(GraspError::InvalidConfig("pose history must not be empty".to_string()));
        }
        if find_object(&objects, &hidden_intent).is_none() {
            return Err(GraspError::UnknownObject(hidden_intent));
        }
        Ok(Self {
            rows,
            cols,
            objects,
            history,
            hidden_intent,
            teleop,
        })
    }

    /// Generate a random scene from `rng`.
    ///
    /// # Errors
    ///
    /// [`GraspError::InvalidConfig`] if the grid cannot hold two objects.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, config: &WorldConfig) -> Result<Self, GraspError> {
        config.validate()?;

        let mut cells: Vec<Cell> = (0..config.rows)
            .flat_map(|r| (0..config.cols).map(move |c| Cell::new(r, c)))
            .collect();
        cells.shuffle(rng);

        let max_n = config.max_objects.min(OBJECT_LABELS.len()).min(cells.len());
        let n_obj = rng.gen_range(2..=max_n);
        let labels: Vec<&str> = OBJECT_LABELS.choose_multiple(rng, n_obj).copied().collect();

        let mut objects: Vec<Object> = labels
            .iter()
            .zip(&cells)
            .enumerate()
            .map(|(i, (label, cell))| Object {
                id: format!("o{i}"),
                label: (*label).to_string(),
                cell: *cell,
                yaw: Yaw::ALL[rng.gen_range(0..Yaw::ALL.len())],
                is_held: false,
            })
            .collect();

        let intended = rng.gen_range(0..n_obj);
        if roll(rng, config.held_distractor_prob) {
            let others: Vec<usize> = (0..n_obj).filter(|i| *i != intended).collect();
            if let Some(&held) = others.choose(rng) {
                objects[held].is_held = true;
            }
        }
        let goal = objects[intended].clone();

        let far: Vec<Cell> = cells
            .iter()
            .copied()
            .filter(|c| manhattan_distance(*c, goal.cell) >= 2)
            .collect();
        let start_cell = far
            .choose(rng)
            .or_else(|| cells.iter().find(|c| **c != goal.cell))
            .copied()
            .unwrap_or(goal.cell);
        let start = Pose::new(start_cell, Yaw::ALL[rng.gen_range(0..Yaw::ALL.len())], ZBand::High);

        let teleop = Teleop::new(config.wander_prob, roll(rng, config.struggle_prob));
        let mut world = Self::from_parts(
            config.rows,
            config.cols,
            objects,
            vec![start],
            goal.id.clone(),
            teleop,
        )?;
        for _ in 1..config.prehistory {
            world.approach_short_of(&goal, rng);
        }

        debug!(
            n_obj,
            intended = %goal.id,
            label = %goal.label,
            struggling = world.teleop.struggling,
            "generated scene"
        );
        Ok(world)
    }

    /// One pre-episode nudge toward `goal` that never lands on its cell.
    ///
    /// A step that would arrive is replaced by a move to a random neighbour
    /// other than the goal, so the gripper loiters near the goal and the
    /// first decision still has work to do.
    fn approach_short_of<R: Rng + ?Sized>(&mut self, goal: &Object, rng: &mut R) {
        let pose = self.current_pose();
        let mut next = self.teleop.nudge(pose, goal, self.rows, self.cols, rng);
        if next.cell == goal.cell {
            let cell = neighbours(pose.cell, self.rows, self.cols)
                .into_iter()
                .filter(|c| *c != goal.cell)
                .collect::<Vec<_>>()
                .choose(rng)
                .copied()
                .unwrap_or(pose.cell);
            next = Pose::new(cell, pose.yaw, band_for(cell, goal.cell));
        }
        self.history.push(next);
    }

    pub fn object(&self, id: &str) -> Option<&Object> {
        find_object(&self.objects, id)
    }

    fn require(&self, id: &str) -> Result<&Object, GraspError> {
        self.object(id)
            .ok_or_else(|| GraspError::UnknownObject(id.to_string()))
    }
}

impl Environment for GridWorld {
    fn current_pose(&self) -> Pose {
        // `from_parts` guarantees a non-empty history and nothing removes poses.
        self.history[self.history.len() - 1]
    }

    fn pose_history(&self) -> &[Pose] {
        &self.history
    }

    fn objects(&self) -> &[Object] {
        &self.objects
    }

    fn hidden_intent(&self) -> &str {
        &self.hidden_intent
    }

    fn apply_tool(&mut self, call: &ToolCall) -> Result<(), GraspError> {
        let pose = self.current_pose();
        let next = match call {
            ToolCall::Interact(_) => return Ok(()),
            ToolCall::Approach { obj } => {
                let target = self.require(obj)?;
                Pose::new(target.cell, pose.yaw, ZBand::Low)
            }
            ToolCall::AlignYaw { obj } => {
                let target = self.require(obj)?;
                Pose::new(pose.cell, target.yaw, pose.z)
            }
        };
        self.history.push(next);
        Ok(())
    }

    fn apply_user_motion<R: Rng + ?Sized>(
        &mut self,
        target_id: &str,
        rng: &mut R,
    ) -> Result<(), GraspError> {
        let target = self.require(target_id)?.clone();
        let pose = self.current_pose();
        let next = self.teleop.nudge(pose, &target, self.rows, self.cols, rng);
        self.history.push(next);
        Ok(())
    }
}
