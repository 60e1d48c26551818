//! `grasp-dataset` – on-disk layout of generated datasets.
//!
//! The simulator produces records in memory; this crate is the only place
//! that touches the filesystem.
//!
//! # Modules
//!
//! - [`jsonl`] – one JSON object per line: [`JsonlWriter`][jsonl::JsonlWriter],
//!   [`write_jsonl`][jsonl::write_jsonl] and [`read_jsonl`][jsonl::read_jsonl].
//! - [`stats`] – the pretty-printed `<out>.stats.json` sidecar.
//! - [`run_dirs`] – numbered run directories (`001`, `002`, …).
//! - [`run_config`] – [`RunConfig`][run_config::RunConfig]: a snapshot of the
//!   arguments a run was started with.

pub mod jsonl;
pub mod run_config;
pub mod run_dirs;
pub mod stats;

pub use jsonl::{JsonlWriter, read_jsonl, write_jsonl};
pub use run_config::RunConfig;
pub use run_dirs::allocate_numbered_run_dir;
pub use stats::{stats_path_for, write_stats};

use thiserror::Error;

/// Errors that can arise while reading or writing dataset files.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{path}:{line}: {source}")]
    BadLine {
        path: String,
        line: usize,
        source: serde_json::Error,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
