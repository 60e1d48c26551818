//! `grasp-sim` – the simulated tabletop.
//!
//! Supplies the spatial side of an episode: object layout, the gripper's pose
//! history, the grid distance metric, and the effectors that move the
//! gripper, either because the assistant executed a motion tool or because
//! the simulated human nudged the teleoperation input.
//!
//! # Modules
//!
//! - [`environment`] – [`Environment`][environment::Environment]: the
//!   contract the episode loop drives. Anything that can report poses and
//!   objects and apply tool calls can host an episode.
//! - [`world`] – [`GridWorld`][world::GridWorld]: a rectangular grid with a
//!   randomly generated object layout and a hidden intended object, built
//!   from a seeded generator and a [`WorldConfig`][world::WorldConfig].
//! - [`teleop`] – the human teleoperation model that nudges the gripper
//!   toward the current goal, including the noisy "wander" and yaw-struggle
//!   behaviours that give the oracle something to react to.
//! - [`builder`] – [`GridWorldBuilder`][builder::GridWorldBuilder]: hand-built
//!   layouts for tests and scripted scenarios.

pub mod builder;
pub mod environment;
pub mod teleop;
pub mod world;

pub use builder::GridWorldBuilder;
pub use environment::Environment;
pub use world::{GridWorld, OBJECT_LABELS, WorldConfig};

pub use grasp_types::manhattan_distance;
