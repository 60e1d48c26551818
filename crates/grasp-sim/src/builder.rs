//! Builder for hand-made scenes.
//!
//! Tests and scripted scenarios need exact layouts rather than random ones.
//! [`GridWorldBuilder`] collects objects and a pose history and produces a
//! [`GridWorld`] with the same behaviour as a generated one.
//!
//! # Example
//!
//! ```rust
//! use grasp_sim::{Environment, GridWorldBuilder};
//! use grasp_types::{Yaw, ZBand};
//!
//! let world = GridWorldBuilder::new(3, 3)
//!     .object("o0", "mug", "A1", Yaw::N)
//!     .object("o1", "sugar_box", "A2", Yaw::E)
//!     .pose("A1", Yaw::N, ZBand::High)
//!     .intended("o0")
//!     .build()
//!     .expect("valid scene");
//!
//! assert_eq!(world.candidates(1), vec!["o0", "o1"]);
//! ```

use grasp_types::{Cell, GraspError, Object, Pose, Yaw, ZBand};

use crate::teleop::Teleop;
use crate::world::GridWorld;

/// Step-by-step construction of a [`GridWorld`].
#[derive(Debug)]
pub struct GridWorldBuilder {
    rows: u8,
    cols: u8,
    objects: Vec<Object>,
    history: Vec<Pose>,
    intended: Option<String>,
    wander_prob: f64,
    struggling: bool,
    error: Option<GraspError>,
}

impl GridWorldBuilder {
    /// Start an empty `rows × cols` scene with a steady, non-wandering human.
    pub fn new(rows: u8, cols: u8) -> Self {
        Self {
            rows,
            cols,
            objects: Vec::new(),
            history: Vec::new(),
            intended: None,
            wander_prob: 0.0,
            struggling: false,
            error: None,
        }
    }

    fn parse_cell(&mut self, cell: &str) -> Cell {
        match cell.parse() {
            Ok(c) => c,
            Err(e) => {
                self.error.get_or_insert(e);
                Cell::new(0, 0)
            }
        }
    }

    /// Place a free object.
    pub fn object(mut self, id: &str, label: &str, cell: &str, yaw: Yaw) -> Self {
        let cell = self.parse_cell(cell);
        self.objects.push(Object {
            id: id.to_string(),
            label: label.to_string(),
            cell,
            yaw,
            is_held: false,
        });
        self
    }

    /// Place an object that is already held and therefore never a candidate
    /// for disambiguation.
    pub fn held_object(mut self, id: &str, label: &str, cell: &str, yaw: Yaw) -> Self {
        self = self.object(id, label, cell, yaw);
        if let Some(last) = self.objects.last_mut() {
            last.is_held = true;
        }
        self
    }

    /// Append one pose to the gripper history.
    pub fn pose(mut self, cell: &str, yaw: Yaw, z: ZBand) -> Self {
        let cell = self.parse_cell(cell);
        self.history.push(Pose::new(cell, yaw, z));
        self
    }

    /// Append `count` copies of the same pose.
    pub fn hold(mut self, cell: &str, yaw: Yaw, z: ZBand, count: usize) -> Self {
        for _ in 0..count {
            self = self.pose(cell, yaw, z);
        }
        self
    }

    /// Set the hidden goal. Defaults to the first object.
    pub fn intended(mut self, id: &str) -> Self {
        self.intended = Some(id.to_string());
        self
    }

    pub fn wander_prob(mut self, p: f64) -> Self {
        self.wander_prob = p;
        self
    }

    pub fn struggling(mut self, struggling: bool) -> Self {
        self.struggling = struggling;
        self
    }

    /// Consume the builder.
    ///
    /// # Errors
    ///
    /// - [`GraspError::InvalidCell`] if any cell string failed to parse.
    /// - [`GraspError::InvalidConfig`] if no pose or no object was added.
    /// - [`GraspError::UnknownObject`] if the intended id names no object.
    pub fn build(self) -> Result<GridWorld, GraspError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        let intended = match self.intended.or_else(|| self.objects.first().map(|o| o.id.clone())) {
            Some(id) => id,
            None => return Err(GraspError::InvalidConfig("scene has no objects".to_string())),
        };
        GridWorld::from_parts(
            self.rows,
            self.cols,
            self.objects,
            self.history,
            intended,
            Teleop::new(self.wander_prob, self.struggling),
        )
    }
}
