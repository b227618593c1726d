use crate::invoke::Invocation;
use crate::model::{InvocationReport, Outcome, RunConfig, TestType};
use crate::selection;
use crate::text_summary;
use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::time::Instant;
use time::format_description::well_known::Rfc3339;

const DEFAULT_RUN_IDS_FILE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/data/1000_random_run_ids.csv");

#[derive(Debug, Parser, Clone)]
#[command(
    name = "run-sampler",
    version,
    about = "Run a pipeline step test against a reproducible random sample of run ids"
)]
pub struct Cli {
    /// CSV file with one run id per row (no header)
    #[arg(long = "run_ids_file", default_value = DEFAULT_RUN_IDS_FILE)]
    pub run_ids_file: PathBuf,

    /// Which step(s) to run the test for (comma-separated)
    #[arg(long = "step_id")]
    pub step_id: String,

    /// Whether to test locally or in the cloud
    #[arg(long = "test_type", value_enum)]
    pub test_type: TestType,

    /// Directory containing the makefile with the test targets
    #[arg(long = "make_path")]
    pub make_path: PathBuf,

    /// Number of run ids to sample
    #[arg(long = "num_run_ids", default_value_t = 100)]
    pub num_run_ids: usize,

    /// Seed for selecting run ids
    #[arg(long = "random_seed", default_value_t = 42)]
    pub random_seed: u64,

    /// Extra run ids to always include (use --num_run_ids 0 to test only these)
    #[arg(long = "extra_run_ids")]
    pub extra_run_ids: Option<String>,

    /// File that receives stdout and stderr of the test (run-local only)
    #[arg(long = "out_file")]
    pub out_file: Option<PathBuf>,

    /// Build tool to invoke
    #[arg(long = "make_program", default_value = "make")]
    pub make_program: String,

    /// Print the command without running it
    #[arg(long = "dry_run")]
    pub dry_run: bool,

    /// Print the final report as JSON
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    pub verbose: bool,
}

/// Build a `RunConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> RunConfig {
    RunConfig {
        run_ids_file: args.run_ids_file.clone(),
        step_ids: selection::split_comma_list(&args.step_id),
        test_type: args.test_type,
        make_path: args.make_path.clone(),
        make_program: args.make_program.clone(),
        num_run_ids: args.num_run_ids,
        random_seed: args.random_seed,
        extra_run_ids: args
            .extra_run_ids
            .as_deref()
            .map(selection::split_comma_list)
            .unwrap_or_default(),
        out_file: args.out_file.clone(),
        dry_run: args.dry_run,
    }
}

/// Status lines go to stdout in text mode and to stderr when stdout carries JSON.
fn status(json: bool, line: String) {
    if json {
        eprintln!("{line}");
    } else {
        println!("{line}");
    }
}

/// Select run ids for `cfg`. Fails before anything is spawned if the sample cannot be drawn.
pub fn select_run_ids(cfg: &RunConfig) -> Result<Vec<String>> {
    let pool = selection::load_pool(&cfg.run_ids_file)?;
    let mut rng = StdRng::seed_from_u64(cfg.random_seed);
    let sampled = selection::sample(&pool, cfg.num_run_ids, &mut rng)
        .with_context(|| format!("failed to select run ids from {}", cfg.run_ids_file.display()))?;
    let sampled_len = sampled.len();
    let selected = selection::merge(sampled, &cfg.extra_run_ids);
    tracing::info!(
        pool_size = pool.len(),
        sampled = sampled_len,
        extra = cfg.extra_run_ids.len(),
        selected = selected.len(),
        seed = cfg.random_seed,
        "selected run ids"
    );
    Ok(selected)
}

/// Select, invoke, and report. A failing build tool is reported, not returned as an error.
pub fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let json = args.json;

    if cfg.step_ids.iter().any(String::is_empty) {
        tracing::warn!(step_id = %args.step_id, "step id list contains an empty element");
    }

    let selected = select_run_ids(&cfg)?;
    if selected.is_empty() {
        tracing::warn!("selection is empty; FIXED_RUN_IDS will be empty");
    }

    let invocation = Invocation::new(&cfg, selected);
    let command = invocation.display();
    status(json, text_summary::command_line(&command));

    let started_at = time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("failed to format start time")?;
    let start = Instant::now();

    let (pid, outcome) = if cfg.dry_run {
        (None, Outcome::NotStarted)
    } else {
        let exec = invocation.spawn_and_wait(|pid| status(json, text_summary::pid_line(pid)))?;
        let outcome = Outcome::from_code(exec.status.code());
        tracing::info!(pid = exec.pid, exit_code = ?outcome.exit_code(), "build tool finished");
        (Some(exec.pid), outcome)
    };

    let report = InvocationReport {
        started_at,
        command,
        test_type: cfg.test_type,
        step_ids: cfg.step_ids.clone(),
        run_ids: invocation.run_ids().to_vec(),
        out_file: invocation.tee_path().map(PathBuf::from),
        pid,
        exit_code: outcome.exit_code(),
        success: outcome.is_success(),
        outcome,
        elapsed: start.elapsed(),
        dry_run: cfg.dry_run,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in text_summary::build_text_summary(&report).lines {
            println!("{line}");
        }
    }

    Ok(())
}
