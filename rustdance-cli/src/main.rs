//! rustdance command-line interface.
//!
//! Reduces pre-unpacked hit lists into histograms and derives the crystal
//! timing deviations from them.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

use clap::{Args, Parser, Subcommand};
use rustdance_algorithms::{estimate_time_deviations, spectra, Analyzer, EventStatus};
use rustdance_core::{AnalysisConfig, HistogramSet, MonitorKind, RunCounters};
use rustdance_io::{bursts, load_adjacency_table, load_timing_pairs, DataFileWriter, HitFileReader};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    RustdanceIo(#[from] rustdance_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] rustdance_core::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no {0} distribution was recorded")]
    MissingDistribution(&'static str),
}

/// Gamma-ray calorimeter time-of-flight event reduction.
#[derive(Parser)]
#[command(name = "rustdance")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Inputs shared by the reduction commands.
#[derive(Args)]
struct ReductionArgs {
    /// Input hit-list file(s), processed in order as one run
    #[arg(required = true)]
    input: Vec<PathBuf>,

    /// Analysis configuration (JSON); defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Crystal adjacency table
    #[arg(long)]
    adjacency: PathBuf,

    /// Timing-pair table
    #[arg(long)]
    timing: PathBuf,

    /// Burst window (nanoseconds); defaults to the configured coincidence window
    #[arg(long)]
    burst_window_ns: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Reduce hit lists into histograms
    Analyze {
        #[command(flatten)]
        reduction: ReductionArgs,

        /// JSON summary of every histogram
        #[arg(short, long)]
        output: PathBuf,

        /// CSV dump of every non-empty bin
        #[arg(long)]
        bins: Option<PathBuf>,
    },

    /// Estimate per-pair timing deviations
    TimeDeviations {
        #[command(flatten)]
        reduction: ReductionArgs,

        /// Output table (channel, cumulative offset)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show information about a hit-list file
    Info {
        /// Input hit-list file
        input: PathBuf,
    },
}

/// Per-run tallies of burst outcomes.
#[derive(Debug, Default)]
struct Tally {
    bursts: u64,
    accepted: u64,
    counted: u64,
    no_marker: u64,
    blocked: u64,
    warnings: u64,
    isomer_pairs: u64,
}

impl Tally {
    fn add(&mut self, status: EventStatus) {
        match status {
            EventStatus::Absent => {}
            EventStatus::Counted => self.counted += 1,
            EventStatus::Accepted => self.accepted += 1,
            EventStatus::NoMarker => self.no_marker += 1,
            EventStatus::Blocked => self.blocked += 1,
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(path) => {
            log::info!("reading configuration from {}", path.display());
            Ok(AnalysisConfig::from_file(path)?)
        }
        None => {
            log::info!("no configuration given, using defaults");
            Ok(AnalysisConfig::default())
        }
    }
}

fn reduce(args: &ReductionArgs) -> Result<(Analyzer, HistogramSet, RunCounters)> {
    let config = load_config(args.config.as_deref())?;
    let window = args.burst_window_ns.unwrap_or(config.coincidence_window_ns);
    let marker = config.channels.t0;

    let adjacency = load_adjacency_table(&args.adjacency)?;
    let timing = load_timing_pairs(&args.timing)?;
    let mut analyzer = Analyzer::new(config, adjacency, timing)?;

    let mut sink = HistogramSet::new();
    analyzer.declare(&mut sink);
    let mut counters = RunCounters::default();
    let mut tally = Tally::default();

    let start = Instant::now();
    for path in &args.input {
        log::info!("reading {}", path.display());
        let reader = HitFileReader::open(path)?;
        for burst in bursts(reader.iter_hits(), window, marker) {
            let report = analyzer.process_burst(&burst, &mut counters, &mut sink);
            tally.bursts += 1;
            tally.add(report.composite);
            tally.warnings += report.warnings.len() as u64;
            tally.isomer_pairs += report.isomer_pairs as u64;
        }
    }
    let elapsed = start.elapsed().as_secs_f64();

    log::info!(
        "{} bursts in {:.2} s: {} accepted, {} counted, {} before first marker, {} dead-time blocked, {} warnings",
        tally.bursts,
        elapsed,
        tally.accepted,
        tally.counted,
        tally.no_marker,
        tally.blocked,
        tally.warnings
    );
    if tally.isomer_pairs > 0 {
        log::info!("{} isomer time differences recorded", tally.isomer_pairs);
    }
    for kind in MonitorKind::ALL {
        log::debug!(
            "{} monitor: {} events",
            kind.label(),
            counters.monitor_events_analyzed[kind.index()]
        );
    }
    if sink.undeclared_records() > 0 {
        log::warn!("{} records into undeclared distributions", sink.undeclared_records());
    }

    Ok((analyzer, sink, counters))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    match cli.command {
        Commands::Analyze {
            reduction,
            output,
            bins,
        } => {
            let (_, sink, counters) = reduce(&reduction)?;

            DataFileWriter::create(&output)?.write_summary_json(&sink)?;
            log::info!("wrote {} histogram summaries to {}", sink.len(), output.display());

            if let Some(bins) = bins {
                DataFileWriter::create(&bins)?.write_bins_csv(&sink)?;
                log::info!("wrote bin contents to {}", bins.display());
            }

            println!("{}", serde_json::to_string_pretty(&counters)?);
        }

        Commands::TimeDeviations { reduction, output } => {
            let (analyzer, sink, _) = reduce(&reduction)?;
            let time_dev = sink
                .get(spectra::TIME_DEV)
                .ok_or(CliError::MissingDistribution(spectra::TIME_DEV))?;

            let deviations =
                estimate_time_deviations(time_dev, analyzer.timing(), &analyzer.config().time_deviation);
            DataFileWriter::create(&output)?.write_time_deviations(&deviations)?;
            log::info!("wrote {} timing deviations to {}", deviations.len(), output.display());
        }

        Commands::Info { input } => {
            let reader = HitFileReader::open(&input)?;
            let file_size = reader.file_size();

            println!("File: {}", input.display());
            println!(
                "Size: {} bytes ({:.2} MB)",
                file_size,
                file_size as f64 / 1_000_000.0
            );
            println!("Hits: {}", reader.hit_count());

            let config = AnalysisConfig::default();
            let mut crystals = 0usize;
            let mut valid_gammas = 0usize;
            let mut markers = 0usize;
            let mut monitors = [0usize; 4];
            let mut range: Option<(f64, f64)> = None;
            for hit in reader.iter_hits() {
                if hit.channel.is_crystal() {
                    crystals += 1;
                }
                if hit.is_valid_gamma() {
                    valid_gammas += 1;
                }
                if hit.channel == config.channels.t0 {
                    markers += 1;
                }
                if let Some(kind) = config.channels.monitor_kind(hit.channel) {
                    monitors[kind.index()] += 1;
                }
                range = Some(match range {
                    Some((lo, hi)) => (lo.min(hit.timestamp), hi.max(hit.timestamp)),
                    None => (hit.timestamp, hit.timestamp),
                });
            }

            println!("Crystal hits: {} ({} valid gamma)", crystals, valid_gammas);
            println!("Markers: {}", markers);
            for kind in MonitorKind::ALL {
                println!("{} monitor hits: {}", kind.label(), monitors[kind.index()]);
            }
            if let Some((lo, hi)) = range {
                println!("Timestamp range: {} - {} ns", lo, hi);
            }
        }
    }

    Ok(())
}
