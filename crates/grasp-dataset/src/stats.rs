//! Stats sidecar next to a dataset file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::DatasetError;

/// `data.jsonl` → `data.jsonl.stats.json`.
pub fn stats_path_for(out: &Path) -> PathBuf {
    let mut name = out.as_os_str().to_os_string();
    name.push(".stats.json");
    PathBuf::from(name)
}

/// Write `stats` as pretty JSON with keys sorted at every level.
pub fn write_stats<T: Serialize>(path: &Path, stats: &T) -> Result<(), DatasetError> {
    // `Value` objects are backed by a BTreeMap, so the round trip sorts keys.
    let value: Value = serde_json::to_value(stats)?;
    let mut text = serde_json::to_string_pretty(&value)?;
    text.push('\n');
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text)?;
    Ok(())
}
