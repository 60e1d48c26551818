//! `grasp-runtime` – the closed-loop episode simulator.
//!
//! Pairs a rule-based decision oracle with a stochastic simulated user and
//! drives both against a [`grasp_sim::Environment`] to produce supervised
//! [`TrainingRecord`][grasp_types::TrainingRecord]s.
//!
//! # Modules
//!
//! - [`detectors`] – pure functions over the candidate set and the pose
//!   history that flag ambiguity and oscillation.
//! - [`oracle`] – [`decide`][oracle::decide]: the nine-branch priority
//!   cascade over [`OracleState`][oracle::OracleState] that emits exactly one
//!   tool call per timestep.
//! - [`user_sim`] – [`UserModel`][user_sim::UserModel]: answers the oracle's
//!   questions consistently with the hidden goal and feeds the answers back
//!   into the oracle state.
//! - [`episode_loop`] – [`EpisodeRunner`][episode_loop::EpisodeRunner]: the
//!   observe–decide–gatekeep–converse–act cycle, with early termination on
//!   goal.
//! - [`loop_guard`] – [`LoopGuard`][loop_guard::LoopGuard]: flags runs of
//!   identical decisions.
//! - [`generator`] – [`generate`][generator::generate]: many seeded episodes
//!   plus the stats sidecar counters.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: installs the
//!   global `tracing` subscriber.
//!
//! # Record gating
//!
//! Every record passes through a [`RecordGate`] before it is kept.
//! [`RecordGate`] is re-exported here so callers can build a custom
//! [`EpisodeRunner`] without a direct dependency on `grasp-kernel`.

pub mod detectors;
pub mod episode_loop;
pub mod generator;
pub mod loop_guard;
pub mod oracle;
pub mod telemetry;
pub mod user_sim;

pub use episode_loop::{EpisodeConfig, EpisodeOutcome, EpisodeRunner};
pub use generator::{GenerationStats, GeneratorConfig, generate};
pub use loop_guard::LoopGuard;
pub use oracle::{OracleState, PromptContext, decide};
pub use telemetry::init_tracing;
pub use user_sim::UserModel;

pub use grasp_kernel::RecordGate;
