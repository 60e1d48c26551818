//! [`RunConfig`] – what a run was started with.
//!
//! Saved as `run_config.json` inside the run directory so a dataset can be
//! traced back to its arguments and regenerated.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::DatasetError;

/// File name used inside run directories.
pub const RUN_CONFIG_FILE: &str = "run_config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub run_id: Uuid,
    pub saved_at: DateTime<Utc>,
    /// Command-line arguments, by name.
    pub args: Map<String, Value>,
    /// Anything else worth keeping, such as the resolved generator settings.
    #[serde(default)]
    pub extra: Map<String, Value>,
}

impl RunConfig {
    /// New snapshot with a fresh id and the current time.
    pub fn new(args: Map<String, Value>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            saved_at: Utc::now(),
            args,
            extra: Map::new(),
        }
    }

    /// Attach an extra entry.
    pub fn with_extra<T: Serialize>(mut self, key: &str, value: &T) -> Result<Self, DatasetError> {
        self.extra.insert(key.to_string(), serde_json::to_value(value)?);
        Ok(self)
    }

    /// Write as pretty JSON to `dir/run_config.json`.
    pub fn save(&self, dir: &Path) -> Result<(), DatasetError> {
        fs::create_dir_all(dir)?;
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        fs::write(dir.join(RUN_CONFIG_FILE), text)?;
        Ok(())
    }

    pub fn load(dir: &Path) -> Result<Self, DatasetError> {
        let raw = fs::read_to_string(dir.join(RUN_CONFIG_FILE))?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args() -> Map<String, Value> {
        let mut args = Map::new();
        args.insert("episodes".into(), json!(100));
        args.insert("seed".into(), json!(7));
        args
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let cfg = RunConfig::new(args())
            .with_extra("horizon", &24)
            .unwrap();
        cfg.save(dir.path()).unwrap();
        let back = RunConfig::load(dir.path()).unwrap();
        assert_eq!(back, cfg);
        assert_eq!(back.args["episodes"], 100);
        assert_eq!(back.extra["horizon"], 24);
    }

    #[test]
    fn each_run_gets_a_fresh_id() {
        assert_ne!(RunConfig::new(args()).run_id, RunConfig::new(args()).run_id);
    }

    #[test]
    fn file_is_human_readable() {
        let dir = tempfile::tempdir().expect("tmp dir");
        RunConfig::new(args()).save(dir.path()).unwrap();
        let raw = fs::read_to_string(dir.path().join(RUN_CONFIG_FILE)).unwrap();
        assert!(raw.contains("\"run_id\""));
        assert!(raw.contains("\n  \"saved_at\""));
    }
}
