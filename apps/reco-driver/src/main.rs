// [apps/reco-driver/src/main.rs]
//! CLI entry point: reads timeslices from `--input`, runs every
//! detector's calibration/cluster/hit finding per timeslice, and writes
//! the results to `--output`. `--dump-archive` instead reads an existing
//! results archive back and prints a per-timeslice summary, without
//! touching `--input`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use reco_domain_detectors::prelude::{HitFinderOrchestrator, OrchestratorConfig};
use reco_driver::prelude::*;
use reco_shared_heimdall::{init_tracing, TracingOverrides};

/// Verbosity accepted by `--log-level`, independent of the `RUST_LOG` env
/// syntax `tracing_subscriber::EnvFilter` otherwise expects.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    /// Per-digi/per-partition detail; expensive to emit at full rate.
    Trace,
    /// Per-module/per-timeslice detail.
    Debug,
    /// Per-run milestones (default outside debug builds).
    Info,
    /// Recoverable anomalies only (dropped digis, bucket overflows already
    /// counted in a monitor still log here if they cross a noteworthy rate).
    Warning,
    /// Fatal conditions only.
    Error,
}

impl LogLevel {
    fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Online reconstruction driver: timeslice ingestion through calibration,
/// cluster/hit finding, and archive output.
#[derive(Debug, Parser)]
#[command(name = "reco-driver", about = "Online reconstruction driver: per-timeslice calibration, cluster and hit finding")]
struct Cli {
    /// Directory (or single file) of input timeslices.
    #[arg(long, env = "CBMRECO_INPUT")]
    input: Option<PathBuf>,

    /// Path the results archive is written to.
    #[arg(long, env = "CBMRECO_OUTPUT")]
    output: Option<PathBuf>,

    /// Path to the JSON calibration parameter block (see `reco_driver::config::RunParameters`).
    #[arg(long, env = "CBMRECO_PARAMS")]
    params: Option<PathBuf>,

    /// zstd-compress the output archive.
    #[arg(long, env = "CBMRECO_COMPRESSED")]
    compressed: bool,

    /// Logging verbosity.
    #[arg(long, env = "CBMRECO_LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,

    /// Write logs to this file instead of stdout.
    #[arg(long, env = "CBMRECO_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Number of worker threads in the hit-finder pool; defaults to the host's core count.
    #[arg(long, env = "CBMRECO_OMP_THREADS")]
    omp_threads: Option<usize>,

    /// Accelerator device index. This build has no accelerator backend
    /// (every stage runs on the CPU worker pool); the flag is accepted
    /// and threaded through for interface compatibility but otherwise unused.
    #[arg(long, env = "CBMRECO_DEVICE")]
    device: Option<u32>,

    /// Process at most this many timeslices.
    #[arg(long, env = "CBMRECO_NUM_TS")]
    num_ts: Option<u64>,

    /// Skip this many timeslices before processing begins.
    #[arg(long, env = "CBMRECO_SKIP_TS", default_value_t = 0)]
    skip_ts: u64,

    /// Record per-stage wall-clock time in the run's telemetry.
    #[arg(long, env = "CBMRECO_COLLECT_KERNEL_TIMES")]
    collect_kernel_times: bool,

    /// Instead of processing `--input`, read back `--output` and print a
    /// per-timeslice summary.
    #[arg(long)]
    dump_archive: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let overrides = TracingOverrides { level: cli.log_level.map(|l| l.as_filter_str().to_string()), file: cli.log_file.clone() };
    let _tracing_guard = init_tracing("reco-driver", overrides);

    if cli.dump_archive {
        let output = cli.output.as_ref().context("--dump-archive requires --output")?;
        return dump_archive(output);
    }

    let input = cli.input.as_ref().context("--input is required unless --dump-archive is set")?;
    let output = cli.output.as_ref().context("--output is required unless --dump-archive is set")?;
    let params_path = cli.params.as_ref().context("--params is required")?;

    let params = RunParameters::load(params_path)?;
    let orchestrator = HitFinderOrchestrator::new(OrchestratorConfig {
        omp_threads: cli.omp_threads,
        collect_kernel_times: cli.collect_kernel_times,
        device: cli.device,
    })
        .context("constructing the hit-finder orchestrator")?;
    let mut pipeline = Pipeline::new(params, orchestrator)?;

    let mut source = TimesliceSource::open(input)?;
    let mut writer = ArchiveWriter::create(output, cli.compressed)?;

    let progress = ProgressBar::new_spinner();
    progress.set_style(ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()));

    let mut n_skipped = 0u64;
    let mut n_processed = 0u64;
    while let Some(raw) = source.next_timeslice()? {
        if n_skipped < cli.skip_ts {
            n_skipped += 1;
            continue;
        }
        if let Some(limit) = cli.num_ts {
            if n_processed >= limit {
                break;
            }
        }

        let timeslice_id = raw.timeslice_id;
        let (results, monitors) = pipeline.process_timeslice(raw);
        writer.write(&results)?;
        n_processed += 1;

        progress.set_message(format!("timeslice {timeslice_id} ({n_processed} processed)"));
        progress.tick();

        if monitors.sts.monster_event_guard_triggered > 0 {
            warn!(timeslice_id, count = monitors.sts.monster_event_guard_triggered, "monster-event guard triggered in at least one STS module");
        }
    }
    writer.flush()?;
    progress.finish_with_message(format!("done: {n_processed} timeslices processed, {n_skipped} skipped"));

    if n_processed == 0 {
        return Err(DriverError::NothingToProcess { skip: cli.skip_ts, num_ts: cli.num_ts }.into());
    }

    info!(n_processed, n_skipped, "reconstruction run complete");
    Ok(())
}
