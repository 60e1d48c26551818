//! JSON Lines reading and writing.
//!
//! # Example
//!
//! ```rust
//! use grasp_dataset::{read_jsonl, write_jsonl};
//! use serde_json::json;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("nested/out.jsonl");
//!
//! write_jsonl(&path, &[json!({"t": 0}), json!({"t": 1})]).unwrap();
//! let back = read_jsonl(&path).unwrap();
//! assert_eq!(back[1]["t"], 1);
//! ```

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::DatasetError;

/// Buffered line writer. Parent directories are created on open.
pub struct JsonlWriter {
    inner: BufWriter<File>,
    lines: usize,
}

impl JsonlWriter {
    /// Create (or truncate) `path`.
    pub fn create(path: &Path) -> Result<Self, DatasetError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            inner: BufWriter::new(File::create(path)?),
            lines: 0,
        })
    }

    /// Append one value as a single line.
    pub fn write<T: Serialize>(&mut self, value: &T) -> Result<(), DatasetError> {
        serde_json::to_writer(&mut self.inner, value)?;
        self.inner.write_all(b"\n")?;
        self.lines += 1;
        Ok(())
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Flush buffered lines to disk and return how many were written.
    pub fn finish(mut self) -> Result<usize, DatasetError> {
        self.inner.flush()?;
        Ok(self.lines)
    }
}

/// Write every item of `records` to `path`, one per line.
pub fn write_jsonl<T: Serialize>(path: &Path, records: &[T]) -> Result<usize, DatasetError> {
    let mut writer = JsonlWriter::create(path)?;
    for rec in records {
        writer.write(rec)?;
    }
    let n = writer.finish()?;
    debug!(path = %path.display(), lines = n, "wrote jsonl");
    Ok(n)
}

/// Read every non-blank line of `path` as a JSON value.
///
/// # Errors
///
/// [`DatasetError::BadLine`] names the 1-based line that failed to parse.
pub fn read_jsonl(path: &Path) -> Result<Vec<Value>, DatasetError> {
    let reader = BufReader::new(File::open(path)?);
    let mut out = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value = serde_json::from_str(&line).map_err(|source| DatasetError::BadLine {
            path: path.display().to_string(),
            line: i + 1,
            source,
        })?;
        out.push(value);
    }
    Ok(out)
}
