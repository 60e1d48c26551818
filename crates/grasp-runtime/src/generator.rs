//! Dataset generation across many episodes.
//!
//! Episode `i` draws every random decision, from the scene layout to the
//! user's replies, from its own `StdRng` seeded with `seed + i`. Episodes are
//! therefore independent of each other, and the same configuration and seed
//! always reproduce the same records.

use std::collections::BTreeMap;

use grasp_sim::{GridWorld, WorldConfig};
use grasp_types::{GraspError, InteractKind, ToolName, TrainingRecord};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::episode_loop::{EpisodeConfig, EpisodeOutcome, EpisodeRunner};
use crate::user_sim::UserModel;

/// Everything needed to generate a dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    #[serde(flatten)]
    pub episode: EpisodeConfig,
    pub world: WorldConfig,
    pub user: UserModel,
}

/// Counters written to the stats sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub episodes: u64,
    pub records: u64,
    /// Records per tool name.
    pub tool_distribution: BTreeMap<String, u64>,
    /// `INTERACT` records per kind.
    pub interact_kinds: BTreeMap<String, u64>,
    /// Episodes that ended on the intended object.
    pub goal_reached: u64,
    /// Episodes in which the loop guard fired.
    pub stalled: u64,
}

impl Default for GenerationStats {
    fn default() -> Self {
        Self {
            episodes: 0,
            records: 0,
            tool_distribution: ToolName::ALL
                .iter()
                .map(|t| (t.as_str().to_string(), 0))
                .collect(),
            interact_kinds: InteractKind::ALL
                .iter()
                .map(|k| (k.as_str().to_string(), 0))
                .collect(),
            goal_reached: 0,
            stalled: 0,
        }
    }
}

impl GenerationStats {
    /// Fold one finished episode into the counters.
    pub fn observe(&mut self, outcome: &EpisodeOutcome) {
        self.episodes += 1;
        self.goal_reached += u64::from(outcome.reached_goal);
        self.stalled += u64::from(outcome.stalled);
        for rec in &outcome.records {
            self.records += 1;
            let call = &rec.target_tool_call;
            *self
                .tool_distribution
                .entry(call.name().as_str().to_string())
                .or_default() += 1;
            if let Some(args) = call.as_interact() {
                *self
                    .interact_kinds
                    .entry(args.kind.as_str().to_string())
                    .or_default() += 1;
            }
        }
    }
}

/// Generate `episodes` episodes starting from `seed`.
///
/// # Errors
///
/// Any [`GraspError`] raised while building a scene or running an episode;
/// generation stops at the first one.
pub fn generate(
    config: &GeneratorConfig,
    episodes: u64,
    seed: u64,
) -> Result<(Vec<TrainingRecord>, GenerationStats), GraspError> {
    let runner = EpisodeRunner::with_parts(
        config.episode.clone(),
        config.user.clone(),
        grasp_kernel::RecordGate::default(),
    );
    let mut records = Vec::new();
    let mut stats = GenerationStats::default();

    for episode_id in 0..episodes {
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(episode_id));
        let mut world = GridWorld::generate(&mut rng, &config.world)?;
        let outcome = runner.run(episode_id, &mut world, &mut rng)?;
        stats.observe(&outcome);
        records.extend(outcome.records);
    }

    info!(
        episodes = stats.episodes,
        records = stats.records,
        goal_reached = stats.goal_reached,
        stalled = stats.stalled,
        "generation complete"
    );
    Ok((records, stats))
}
