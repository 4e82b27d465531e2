//! stencil - replicate a versioned scaffold into a repository without
//! clobbering local files.
//!
//! Usage:
//!   stencil --target PATH                 Scan for conflicts, write nothing
//!   stencil --apply --target PATH         Copy the scaffold if nothing conflicts
//!   stencil --target PATH --report-format json
//!
//! Exit status: 0 success, 1 conflicts found, 2 fatal error, 3 copy finished
//! with per-path failures.

mod report;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Context, Result};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use stencil_core::{CaseFoldPolicy, CloneConfig, Manifest, Mode};
use stencil_ops::{Pipeline, PipelineStatus};

use crate::report::OutputFormat;

const EXIT_CONFLICTS: u8 = 1;
const EXIT_FATAL: u8 = 2;
const EXIT_PARTIAL: u8 = 3;

#[derive(Parser)]
#[command(
    name = "stencil",
    version,
    about = "Replicate a versioned scaffold into a repository",
    long_about = "stencil copies the paths listed in a scaffold manifest into a target \
                  repository.\n\n\
                  Every run scans the target first. If any manifest path already exists \
                  there, or cannot be inspected, nothing is written and the conflicts are \
                  reported. Pass --apply to copy once the scan is clean."
)]
struct Cli {
    /// Scan only and never write (the default)
    #[arg(long, visible_alias = "check", conflicts_with = "apply")]
    dry_run: bool,

    /// Copy the scaffold into the target when the scan finds no conflicts
    #[arg(long)]
    apply: bool,

    /// Repository to replicate the scaffold into
    #[arg(short, long)]
    target: PathBuf,

    /// Scaffold root holding the template files and `manifest/scaffold.json`.
    /// Defaults to the current working directory, so pass it explicitly when
    /// running from inside the target repository.
    #[arg(short, long, default_value = ".")]
    source: PathBuf,

    /// Manifest file (defaults to <SOURCE>/manifest/scaffold.json)
    #[arg(short, long)]
    manifest: Option<PathBuf>,

    /// Report format
    #[arg(long, default_value = "text")]
    report_format: OutputFormat,

    /// Whether to check for names that collide on a case-insensitive target
    #[arg(long, default_value = "auto")]
    case_fold: CaseFold,

    /// Number of worker threads for lookups and copies
    #[arg(short, long, default_value = "1")]
    jobs: usize,

    /// Overwrite entries that appear in the target between scan and copy
    #[arg(long)]
    no_verify: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CaseFold {
    Auto,
    Always,
    Never,
}

impl From<CaseFold> for CaseFoldPolicy {
    fn from(value: CaseFold) -> Self {
        match value {
            CaseFold::Auto => CaseFoldPolicy::Auto,
            CaseFold::Always => CaseFoldPolicy::Always,
            CaseFold::Never => CaseFoldPolicy::Never,
        }
    }
}

fn main() -> ExitCode {
    if let Err(err) = color_eyre::install() {
        eprintln!("Error: {err:?}");
        return ExitCode::from(EXIT_FATAL);
    }

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

/// Load everything, run the pipeline, print the report.
fn run(cli: Cli) -> Result<ExitCode> {
    let source = cli
        .source
        .canonicalize()
        .with_context(|| format!("Invalid source path {}", cli.source.display()))?;
    let target = std::path::absolute(&cli.target)
        .with_context(|| format!("Invalid target path {}", cli.target.display()))?;
    let manifest_path = cli
        .manifest
        .unwrap_or_else(|| Manifest::default_location(&source));

    let manifest = Manifest::load(&manifest_path).context("Failed to load manifest")?;
    debug!(path = %manifest_path.display(), entries = manifest.len(), "manifest loaded");

    let mode = if cli.apply { Mode::Commit } else { Mode::Preview };
    let config = CloneConfig::builder()
        .source_root(source)
        .target_root(target.clone())
        .mode(mode)
        .case_fold(CaseFoldPolicy::from(cli.case_fold))
        .workers(cli.jobs)
        .verify_before_write(!cli.no_verify)
        .build()
        .context("Invalid configuration")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .context("Failed to start runtime")?;

    let mut pipeline = Pipeline::new(config);
    let mut copy_rx = pipeline.subscribe_copy();
    let drain = runtime.spawn(async move {
        loop {
            match copy_rx.recv().await {
                Ok(progress) => info!(
                    completed = progress.entries_completed,
                    total = progress.entries_total,
                    errors = progress.errors,
                    path = progress.current_file.as_ref().map(|p| p.as_str()).unwrap_or(""),
                    "[{:>5.1}%] copying",
                    progress.percentage()
                ),
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "copy progress lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let outcome = pipeline.run(&manifest);
    // Dropping the pipeline closes the progress channel so the drain ends.
    drop(pipeline);
    if let Err(err) = runtime.block_on(drain) {
        warn!(error = %err, "progress task failed");
    }
    let report = outcome.context("Clone failed")?;

    println!("{}", report::render(&report, cli.report_format, &target)?);

    let code = match report.status {
        PipelineStatus::Clean | PipelineStatus::Committed => ExitCode::SUCCESS,
        PipelineStatus::ConflictsFound => {
            if mode == Mode::Commit {
                eprintln!("Apply aborted: conflicts detected. Resolve manually and retry.");
            }
            ExitCode::from(EXIT_CONFLICTS)
        }
        PipelineStatus::PartiallyCommitted => {
            eprintln!("Apply incomplete: some paths could not be copied.");
            ExitCode::from(EXIT_PARTIAL)
        }
    };

    if report.status == PipelineStatus::Clean && cli.report_format == OutputFormat::Text {
        eprintln!("No conflicts detected. Safe to apply.");
    }

    Ok(code)
}
