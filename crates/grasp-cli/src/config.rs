//! Configuration Vault – reads/writes `~/.grasp/config.toml`.

use grasp_runtime::{EpisodeConfig, GeneratorConfig, UserModel};
use grasp_sim::WorldConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted generator configuration stored in `~/.grasp/config.toml`.
///
/// Scalars sit at the top level; scene and user parameters live in the
/// `[world]` and `[user]` tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Maximum timesteps per episode.
    #[serde(default = "default_horizon")]
    pub horizon: u32,

    /// Grid distance within which objects are offered as candidates.
    #[serde(default = "default_candidate_radius")]
    pub candidate_radius: u32,

    /// Chance the simulated human leaves the gripper alone after a motion.
    #[serde(default = "default_skip_user_motion_prob")]
    pub skip_user_motion_prob: f64,

    /// Identical consecutive decisions reported as a stall.
    #[serde(default = "default_loop_guard_threshold")]
    pub loop_guard_threshold: usize,

    /// Parent of the numbered run directories used when `--out` is omitted.
    #[serde(default = "default_runs_root")]
    pub runs_root: PathBuf,

    #[serde(default)]
    pub world: WorldConfig,

    #[serde(default)]
    pub user: UserModel,
}

fn default_horizon() -> u32 {
    24
}
fn default_candidate_radius() -> u32 {
    1
}
fn default_skip_user_motion_prob() -> f64 {
    0.85
}
fn default_loop_guard_threshold() -> usize {
    4
}
fn default_runs_root() -> PathBuf {
    PathBuf::from("data").join("runs")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            horizon: default_horizon(),
            candidate_radius: default_candidate_radius(),
            skip_user_motion_prob: default_skip_user_motion_prob(),
            loop_guard_threshold: default_loop_guard_threshold(),
            runs_root: default_runs_root(),
            world: WorldConfig::default(),
            user: UserModel::default(),
        }
    }
}

impl Config {
    /// Settings handed to [`grasp_runtime::generate`].
    pub fn to_generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            episode: EpisodeConfig {
                horizon: self.horizon,
                candidate_radius: self.candidate_radius,
                skip_user_motion_prob: self.skip_user_motion_prob,
                loop_guard_threshold: self.loop_guard_threshold,
            },
            world: self.world.clone(),
            user: self.user.clone(),
        }
    }
}

/// Return the path to `~/.grasp/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".grasp").join("config.toml")
}

/// Load the config from the default location. Returns `None` if the file
/// does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

/// Load the config from a specific path, applying environment overrides.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Resolve the effective configuration.
///
/// An explicit path must exist. Without one, `~/.grasp/config.toml` is used
/// when present and the defaults otherwise. Environment overrides apply in
/// every case.
pub fn resolve(explicit: Option<&Path>) -> Result<Config, String> {
    match explicit {
        Some(path) => load_from(path)?
            .ok_or_else(|| format!("Config file {} not found", path.display())),
        None => match load()? {
            Some(cfg) => Ok(cfg),
            None => {
                let mut cfg = Config::default();
                apply_env_overrides(&mut cfg);
                Ok(cfg)
            }
        },
    }
}

/// Apply `GRASP_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `GRASP_HORIZON` | `horizon` |
/// | `GRASP_CANDIDATE_RADIUS` | `candidate_radius` |
/// | `GRASP_RUNS_ROOT` | `runs_root` |
///
/// Values that do not parse are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("GRASP_HORIZON")
        && let Ok(horizon) = v.parse::<u32>()
    {
        cfg.horizon = horizon;
    }
    if let Ok(v) = std::env::var("GRASP_CANDIDATE_RADIUS")
        && let Ok(radius) = v.parse::<u32>()
    {
        cfg.candidate_radius = radius;
    }
    if let Ok(v) = std::env::var("GRASP_RUNS_ROOT")
        && !v.is_empty()
    {
        cfg.runs_root = PathBuf::from(v);
    }
}

/// Save the config to disk, creating `~/.grasp/` if necessary.
pub fn save(cfg: &Config) -> Result<PathBuf, String> {
    let path = config_path();
    save_to(cfg, &path)?;
    Ok(path)
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let raw = to_toml(cfg)?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}

/// Render `cfg` as TOML.
pub fn to_toml(cfg: &Config) -> Result<String, String> {
    toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))
}
