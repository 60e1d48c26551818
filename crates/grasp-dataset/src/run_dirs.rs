//! Numbered run directories.
//!
//! Each generation run gets its own directory under a common root, named by
//! a zero-padded counter: `001`, `002`, … The next number is one past the
//! highest existing one; if that name is taken in the meantime the counter
//! steps forward until a fresh directory can be created.
//!
//! # Example
//!
//! ```rust
//! use grasp_dataset::allocate_numbered_run_dir;
//!
//! let root = tempfile::tempdir().unwrap();
//! let first = allocate_numbered_run_dir(root.path(), 3).unwrap();
//! let second = allocate_numbered_run_dir(root.path(), 3).unwrap();
//! assert!(first.ends_with("001"));
//! assert!(second.ends_with("002"));
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::DatasetError;

/// Highest `width`-digit directory number under `root`, if any.
fn highest_existing(root: &Path, width: usize) -> Result<Option<u64>, DatasetError> {
    let mut best = None;
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.len() != width || !name.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        if let Ok(n) = name.parse::<u64>() {
            best = best.max(Some(n));
        }
    }
    Ok(best)
}

/// Create and return the next free run directory under `root`.
///
/// `root` is created if missing.
///
/// # Errors
///
/// - [`DatasetError::InvalidArgument`] if `width` is 0.
/// - [`DatasetError::Io`] on any filesystem failure other than a name
///   collision.
pub fn allocate_numbered_run_dir(root: &Path, width: usize) -> Result<PathBuf, DatasetError> {
    if width == 0 {
        return Err(DatasetError::InvalidArgument("width must be >= 1".to_string()));
    }
    fs::create_dir_all(root)?;

    let mut next = highest_existing(root, width)?.map_or(1, |n| n + 1);
    loop {
        let dir = root.join(format!("{next:0width$}"));
        match fs::create_dir(&dir) {
            Ok(()) => {
                info!(run_dir = %dir.display(), "allocated run directory");
                return Ok(dir);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => next += 1,
            Err(e) => return Err(e.into()),
        }
    }
}
