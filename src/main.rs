//! Pramana - coverage analysis command line
//!
//! # Usage
//!
//! ```bash
//! # Match detections against the registry with config defaults
//! pramana analyze --references refs.json --detections dets.json
//!
//! # Override parameters and write map/report files
//! pramana analyze --references refs.json --detections dets.json \
//!     --radius 40 --cluster-radius 0 --algorithm optimal_assignment \
//!     --geojson coverage.geojson --report report.json
//!
//! # Summarize the registry alone
//! pramana references --references refs.json --geojson registry.geojson
//!
//! # List matching algorithms
//! pramana algorithms
//! ```

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use pramana::io::{coverage_layer, load_detections, load_references, reference_layer, write_json};
use pramana::{
    AnalysisJob, Config, CoverageAnalyzer, IndexBackend, MatchAlgorithm, ReferenceSummary, Result,
};

const DEFAULT_CONFIG_PATHS: [&str; 2] = ["pramana.toml", "/etc/pramana.toml"];

#[derive(Parser)]
#[command(name = "pramana")]
#[command(about = "Match reference markers against sensor detections", version)]
struct Cli {
    /// TOML config file (default: pramana.toml, then /etc/pramana.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a coverage analysis
    Analyze(AnalyzeArgs),
    /// Summarize a reference registry
    References(ReferencesArgs),
    /// List the available matching algorithms
    Algorithms,
}

#[derive(Args)]
struct AnalyzeArgs {
    /// JSON array of reference points
    #[arg(short, long)]
    references: PathBuf,

    /// JSON array of detections
    #[arg(short, long)]
    detections: PathBuf,

    /// Match radius in meters
    #[arg(long)]
    radius: Option<f64>,

    /// Detection clustering radius in meters (0 disables clustering)
    #[arg(long)]
    cluster_radius: Option<f64>,

    #[arg(short, long, value_enum)]
    algorithm: Option<MatchAlgorithm>,

    #[arg(long, value_enum)]
    backend: Option<IndexBackend>,

    /// Write the map layer to this file
    #[arg(long)]
    geojson: Option<PathBuf>,

    /// Write the full report to this file
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Args)]
struct ReferencesArgs {
    /// JSON array of reference points
    #[arg(short, long)]
    references: PathBuf,

    /// Write the registry layer to this file
    #[arg(long)]
    geojson: Option<PathBuf>,
}

/// Explicit `--config`, else the first default path that exists, else
/// defaults. A file that exists but fails to load is an error.
fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path,
        None => match DEFAULT_CONFIG_PATHS
            .into_iter()
            .map(Path::new)
            .find(|p| fs::metadata(p).is_ok())
        {
            Some(path) => path,
            None => {
                log::info!("No config file found, using defaults");
                return Ok(Config::default());
            }
        },
    };

    let config = Config::load(path).inspect_err(|e| {
        log::error!("Failed to load config {}: {}", path.display(), e);
    })?;
    log::info!("Loaded config from {}", path.display());
    Ok(config)
}

fn run_analyze(mut config: Config, args: AnalyzeArgs) -> Result<()> {
    if let Some(radius) = args.radius {
        config.analysis.radius_meters = radius;
    }
    if let Some(cluster_radius) = args.cluster_radius {
        config.analysis.cluster_radius_meters = cluster_radius;
    }
    if let Some(algorithm) = args.algorithm {
        config.analysis.algorithm = algorithm;
    }
    if let Some(backend) = args.backend {
        config.index.backend = backend;
    }
    let params = config.analysis.params();
    params.validate()?;

    let references = load_references(&args.references)?;
    let detections = load_detections(&args.detections)?;

    log::info!("pramana analyze");
    log::info!("  References: {} ({})", references.len(), args.references.display());
    log::info!("  Detections: {} ({})", detections.len(), args.detections.display());
    log::info!(
        "  Radius: {:.1}m, cluster radius: {:.1}m",
        params.radius_meters,
        params.cluster_radius_meters
    );
    log::info!("  Algorithm: {} ({})", params.algorithm, params.algorithm.description());
    log::info!("  Index: {}", config.index.backend);

    let analyzer = Arc::new(CoverageAnalyzer::new(&config));
    let job = AnalysisJob::spawn(analyzer, references, detections, params)?;
    for event in job.progress().iter() {
        log::debug!("[{:>3}%] {}", event.percent, event.phase);
    }
    let analysis = job.join()?;
    let report = &analysis.report;

    let summary = report.stats.summary();
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "Coverage:      {}", summary.coverage)?;
    writeln!(stdout, "Undetected:    {}", report.stats.undetected)?;
    writeln!(stdout, "New findings:  {}", summary.potential_new)?;
    writeln!(stdout, "Unclaimed:     {}", report.stats.unclaimed)?;
    writeln!(stdout, "Time:          {:.1} ms", report.stats.processing_time_ms)?;

    if let Some(path) = &args.geojson {
        write_json(path, &coverage_layer(report))?;
        log::info!("Map layer written to {}", path.display());
    }
    if let Some(path) = &args.report {
        write_json(path, report.as_ref())?;
        log::info!("Report written to {}", path.display());
    }
    Ok(())
}

fn run_references(args: ReferencesArgs) -> Result<()> {
    let references = load_references(&args.references)?;
    let summary = ReferenceSummary::from_points(&references);

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &summary)?;
    writeln!(stdout)?;

    if let Some(path) = &args.geojson {
        write_json(path, &reference_layer(&references))?;
        log::info!("Registry layer written to {}", path.display());
    }
    Ok(())
}

fn run_algorithms() -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    for algorithm in MatchAlgorithm::all() {
        writeln!(stdout, "{:<20} {}", algorithm.as_str(), algorithm.description())?;
    }
    Ok(())
}

fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let cli = Cli::parse();
    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(_) => return ExitCode::FAILURE,
    };

    let result = match cli.command {
        Command::Analyze(args) => run_analyze(config, args),
        Command::References(args) => run_references(args),
        Command::Algorithms => run_algorithms(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
