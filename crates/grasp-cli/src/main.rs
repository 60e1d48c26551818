//! `grasp-cli` – command line front end for the grasp-assistance dataset
//! generator.
//!
//! Subcommands:
//!
//! - `grasp generate` runs the simulator and writes a JSONL dataset plus its
//!   stats sidecar. Without `--out` a numbered run directory is allocated
//!   under `runs_root` and also receives `run_config.json` and
//!   `tool_call.schema.json`.
//! - `grasp validate` re-checks every record of a dataset against the
//!   tool-call schema.
//! - `grasp inspect` prints a short summary of the first records.
//! - `grasp schema` prints the JSON Schema of a tool call.
//! - `grasp config` prints the resolved configuration, optionally saving it
//!   to `~/.grasp/config.toml`.

mod config;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use grasp_dataset::{
    RunConfig, allocate_numbered_run_dir, read_jsonl, stats_path_for, write_jsonl, write_stats,
};
use grasp_kernel::RecordGate;
use grasp_runtime::GenerationStats;
use grasp_types::{ToolCall, TrainingRecord};
use serde_json::{Map, Value, json};
use tracing::info;

/// Dataset file name inside a run directory.
const DATASET_FILE: &str = "dataset.jsonl";
/// Tool-call schema file name inside a run directory.
const SCHEMA_FILE: &str = "tool_call.schema.json";
/// Digits in a run directory name.
const RUN_DIR_WIDTH: usize = 3;

#[derive(Parser)]
#[command(name = "grasp")]
#[command(about = "Grasp-assistance dialogue dataset generator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate episodes and write the training records
    Generate {
        /// Number of episodes to simulate
        #[arg(short, long)]
        episodes: u64,

        /// Base seed; episode i uses seed + i
        #[arg(short, long, default_value = "0")]
        seed: u64,

        /// Output JSONL file (default: a new numbered run directory)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Config file (default: ~/.grasp/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Check every record of a dataset against the tool-call schema
    Validate {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Print a summary of the first records of a dataset
    Inspect {
        #[arg(short, long)]
        file: PathBuf,

        /// Number of records to show
        #[arg(short, long, default_value = "3")]
        n: usize,
    },

    /// Print the JSON Schema of a tool call
    Schema,

    /// Print the resolved configuration
    Config {
        /// Config file (default: ~/.grasp/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Save the resolved configuration to ~/.grasp/config.toml
        #[arg(long)]
        write: bool,
    },
}

fn main() -> ExitCode {
    // ── Structured logging ────────────────────────────────────────────────
    // RUST_LOG filters (default "info"); GRASP_LOG_FORMAT=json switches to
    // JSON lines. Logs go to stderr, command output to stdout.
    grasp_runtime::init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Generate {
            episodes,
            seed,
            out,
            config,
        } => run_generate(episodes, seed, out, config.as_deref()),
        Commands::Validate { file } => run_validate(&file),
        Commands::Inspect { file, n } => run_inspect(&file, n),
        Commands::Schema => tool_call_schema().map(|text| println!("{text}")),
        Commands::Config { config, write } => run_config(config.as_deref(), write),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

// ── generate ──────────────────────────────────────────────────────────────

/// Where a generation run put its files.
#[derive(Debug)]
struct GenerateReport {
    dataset: PathBuf,
    stats_file: PathBuf,
    run_dir: Option<PathBuf>,
    stats: GenerationStats,
}

fn run_generate(
    episodes: u64,
    seed: u64,
    out: Option<PathBuf>,
    config_file: Option<&Path>,
) -> Result<(), String> {
    let cfg = config::resolve(config_file)?;
    let report = generate_dataset(&cfg, episodes, seed, out, config_file)?;

    println!(
        "{} {} episode(s), {} record(s)",
        "✓ Generated".green().bold(),
        report.stats.episodes,
        report.stats.records
    );
    if let Some(dir) = &report.run_dir {
        println!("  Run directory  {}", dir.display().to_string().bold());
    }
    println!("  Dataset        {}", report.dataset.display());
    println!("  Stats          {}", report.stats_file.display());
    for (tool, count) in &report.stats.tool_distribution {
        println!("    {:<10} {}", tool, count);
    }
    println!(
        "  Goal reached in {} episode(s), {} stalled",
        report.stats.goal_reached,
        report.stats.stalled.to_string().yellow()
    );
    Ok(())
}

fn generate_dataset(
    cfg: &config::Config,
    episodes: u64,
    seed: u64,
    out: Option<PathBuf>,
    config_file: Option<&Path>,
) -> Result<GenerateReport, String> {
    let generator = cfg.to_generator_config();
    let (records, stats) = grasp_runtime::generate(&generator, episodes, seed)
        .map_err(|e| format!("Generation failed: {e}"))?;

    let (dataset, run_dir) = match out {
        Some(path) => (path, None),
        None => {
            let dir = allocate_numbered_run_dir(&cfg.runs_root, RUN_DIR_WIDTH)
                .map_err(|e| format!("Failed to allocate run directory: {e}"))?;
            (dir.join(DATASET_FILE), Some(dir))
        }
    };

    let lines = write_jsonl(&dataset, &records)
        .map_err(|e| format!("Failed to write {}: {e}", dataset.display()))?;
    let stats_file = stats_path_for(&dataset);
    write_stats(&stats_file, &stats)
        .map_err(|e| format!("Failed to write {}: {e}", stats_file.display()))?;

    if let Some(dir) = &run_dir {
        let mut args = Map::new();
        args.insert("episodes".into(), json!(episodes));
        args.insert("seed".into(), json!(seed));
        args.insert("out".into(), json!(dataset.display().to_string()));
        args.insert(
            "config".into(),
            config_file.map_or(Value::Null, |p| json!(p.display().to_string())),
        );
        RunConfig::new(args)
            .with_extra("generator", &generator)
            .and_then(|rc| rc.with_extra("stats", &stats))
            .and_then(|rc| rc.save(dir))
            .map_err(|e| format!("Failed to write run config: {e}"))?;

        let schema_file = dir.join(SCHEMA_FILE);
        let mut schema = tool_call_schema()?;
        schema.push('\n');
        std::fs::write(&schema_file, schema)
            .map_err(|e| format!("Failed to write {}: {e}", schema_file.display()))?;
    }

    info!(
        dataset = %dataset.display(),
        records = lines,
        episodes,
        seed,
        "dataset written"
    );
    Ok(GenerateReport {
        dataset,
        stats_file,
        run_dir,
        stats,
    })
}

// ── validate ──────────────────────────────────────────────────────────────

fn run_validate(file: &Path) -> Result<(), String> {
    let values = read_jsonl(file).map_err(|e| e.to_string())?;
    let failures = validate_values(&values);
    for (index, reason) in &failures {
        println!("  {} record {}: {}", "✗".red(), index + 1, reason);
    }
    if !failures.is_empty() {
        return Err(format!(
            "{} of {} record(s) failed validation",
            failures.len(),
            values.len()
        ));
    }
    println!(
        "{} {} record(s) in {}",
        "✓ Valid".green().bold(),
        values.len(),
        file.display()
    );
    Ok(())
}

/// Indices and reasons of every record the gate rejects.
fn validate_values(values: &[Value]) -> Vec<(usize, String)> {
    let gate = RecordGate::default();
    values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| gate.admit_value(v).err().map(|e| (i, e.to_string())))
        .collect()
}

// ── inspect ───────────────────────────────────────────────────────────────

fn run_inspect(file: &Path, n: usize) -> Result<(), String> {
    let values = read_jsonl(file).map_err(|e| e.to_string())?;
    println!(
        "{} ({} record(s), showing {})",
        file.display().to_string().bold(),
        values.len(),
        n.min(values.len())
    );
    for value in values.into_iter().take(n) {
        let record: TrainingRecord =
            serde_json::from_value(value).map_err(|e| format!("Malformed record: {e}"))?;
        println!();
        for line in summarize(&record) {
            println!("{line}");
        }
    }
    Ok(())
}

/// Human-readable lines describing one record.
fn summarize(record: &TrainingRecord) -> Vec<String> {
    let call = &record.target_tool_call;
    let mut lines = vec![format!(
        "episode {} t={} {}",
        record.episode_id,
        record.t,
        call.name().as_str().cyan()
    )];
    match call.as_interact() {
        Some(args) => {
            lines.push(format!("  {} {}", args.kind.as_str().dimmed(), args.text));
            lines.push(format!("  choices: {}", args.choices.join(" | ")));
        }
        None => {
            if let Some(obj) = call.target() {
                lines.push(format!("  obj: {obj}"));
            }
        }
    }
    if let Some(pose) = record.gripper_hist.last() {
        lines.push(format!("  gripper: {} {:?} {:?}", pose.cell, pose.yaw, pose.z));
    }
    lines.push(format!(
        "  candidates: [{}]  interactions: {}",
        record.memory.candidates.join(", "),
        record.memory.n_interactions
    ));
    for turn in &record.memory.past_dialogs {
        lines.push(format!("  {:?}: {}", turn.role, turn.content));
    }
    lines
}

// ── schema / config ───────────────────────────────────────────────────────

fn tool_call_schema() -> Result<String, String> {
    let schema = schemars::schema_for!(ToolCall);
    serde_json::to_string_pretty(&schema).map_err(|e| format!("Failed to render schema: {e}"))
}

fn run_config(config_file: Option<&Path>, write: bool) -> Result<(), String> {
    let cfg = config::resolve(config_file)?;
    print!("{}", config::to_toml(&cfg)?);
    if write {
        let path = config::save(&cfg)?;
        println!(
            "{} {}",
            "✓ Saved".green().bold(),
            path.display().to_string().bold()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn small_config(runs_root: &Path) -> config::Config {
        config::Config {
            horizon: 8,
            runs_root: runs_root.to_path_buf(),
            ..config::Config::default()
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn generate_defaults_seed_to_zero() {
        let cli = Cli::try_parse_from(["grasp", "generate", "--episodes", "5"]).unwrap();
        match cli.command {
            Commands::Generate {
                episodes, seed, out, ..
            } => {
                assert_eq!(episodes, 5);
                assert_eq!(seed, 0);
                assert!(out.is_none());
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn explicit_out_writes_dataset_and_sidecar() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let out = dir.path().join("set/train.jsonl");
        let report =
            generate_dataset(&small_config(dir.path()), 4, 11, Some(out.clone()), None).unwrap();

        assert!(report.run_dir.is_none());
        assert_eq!(report.dataset, out);
        assert_eq!(report.stats_file, dir.path().join("set/train.jsonl.stats.json"));

        let values = read_jsonl(&out).unwrap();
        assert_eq!(values.len() as u64, report.stats.records);
        assert!(validate_values(&values).is_empty());

        let stats: Value =
            serde_json::from_str(&std::fs::read_to_string(&report.stats_file).unwrap()).unwrap();
        assert_eq!(stats["episodes"], 4);
        assert!(stats["tool_distribution"].get("INTERACT").is_some());
    }

    #[test]
    fn run_directory_receives_every_artifact() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let root = dir.path().join("runs");
        let cfg = small_config(&root);

        let first = generate_dataset(&cfg, 2, 3, None, None).unwrap();
        let second = generate_dataset(&cfg, 2, 3, None, None).unwrap();

        let run_dir = first.run_dir.unwrap();
        assert_eq!(run_dir, root.join("001"));
        assert_eq!(second.run_dir.unwrap(), root.join("002"));
        assert!(run_dir.join(DATASET_FILE).exists());
        assert!(run_dir.join("dataset.jsonl.stats.json").exists());
        assert!(run_dir.join(SCHEMA_FILE).exists());

        let saved = RunConfig::load(&run_dir).unwrap();
        assert_eq!(saved.args["episodes"], 2);
        assert_eq!(saved.args["seed"], 3);
        assert!(saved.args["config"].is_null());
        assert_eq!(saved.extra["generator"]["horizon"], 8);
    }

    #[test]
    fn same_seed_same_dataset() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let cfg = small_config(dir.path());
        let a = dir.path().join("a.jsonl");
        let b = dir.path().join("b.jsonl");
        generate_dataset(&cfg, 3, 42, Some(a.clone()), None).unwrap();
        generate_dataset(&cfg, 3, 42, Some(b.clone()), None).unwrap();
        assert_eq!(
            std::fs::read_to_string(a).unwrap(),
            std::fs::read_to_string(b).unwrap()
        );
    }

    #[test]
    fn validation_reports_bad_records_by_index() {
        let good = json!({
            "episode_id": 0,
            "t": 0,
            "objects": [],
            "gripper_hist": [{}, {}, {}, {}, {}, {}],
            "memory": {},
            "target_tool_call": {"tool": "APPROACH", "args": {"obj": "o1"}},
        });
        let mut bad = good.clone();
        bad["target_tool_call"] = json!({"tool": "GRAB", "args": {"obj": "o1"}});

        let failures = validate_values(&[good, bad]);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, 1);
    }

    #[test]
    fn schema_names_every_tool() {
        let text = tool_call_schema().unwrap();
        for tool in ["INTERACT", "APPROACH", "ALIGN_YAW"] {
            assert!(text.contains(tool), "schema is missing {tool}");
        }
    }

    #[test]
    fn summary_shows_tool_and_dialog() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let out = dir.path().join("d.jsonl");
        generate_dataset(&small_config(dir.path()), 1, 5, Some(out.clone()), None).unwrap();

        let first: TrainingRecord =
            serde_json::from_value(read_jsonl(&out).unwrap().remove(0)).unwrap();
        let lines = summarize(&first);
        assert!(lines[0].starts_with("episode 0 t=0"));
        assert!(lines.iter().any(|l| l.contains("candidates:")));
    }
}
