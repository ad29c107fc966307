//! Listing-Harvest main entry point
//!
//! This is the command-line interface for the Listing-Harvest scraper.

use anyhow::Context;
use clap::{Parser, Subcommand};
use listing_harvest::config::{load_config_with_hash, validate, Config};
use listing_harvest::crawler::{Harvester, RunMode};
use listing_harvest::logging::{init_logging, DEFAULT_LOG_FILE};
use listing_harvest::output::{print_report, RunReport};
use listing_harvest::{RecencyFilter, SearchDimension, SortOrder};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Listing-Harvest: a polite, incremental listing scraper
///
/// Listing-Harvest pages through a rate-limited job-listing service,
/// enriches every listing with its detail document, and appends the
/// records to a CSV file in batches so an interrupted run keeps what it
/// already saved.
#[derive(Parser, Debug)]
#[command(name = "listing-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A polite, incremental listing scraper", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Log file, appended to across runs
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Directory the CSV file is written to
    #[arg(short, long, value_name = "DIR")]
    output: Option<String>,

    /// Concurrent detail fetches
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..=16))]
    workers: Option<u16>,

    /// Skip detail documents and persist listing fields only
    #[arg(long)]
    no_details: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// One keyword search, unfiltered
    Simple {
        /// Search keywords
        #[arg(short, long)]
        keywords: Option<String>,

        /// Number of listings to aim for
        #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u32).range(1..))]
        quota: u32,

        /// Location to search in
        #[arg(short, long)]
        location: Option<String>,
    },

    /// Every sort order and recency filter combination, rows tagged
    Dimensions {
        /// Number of listings to aim for per combination
        #[arg(long, default_value_t = 400, value_parser = clap::value_parser!(u32).range(1..))]
        quota: u32,

        /// Location to search in
        #[arg(short, long)]
        location: Option<String>,

        /// Only these sort orders (relevant, recent, applied)
        #[arg(long, value_delimiter = ',', value_parser = parse_sort)]
        sort: Vec<SortOrder>,

        /// Only these recency filters (24h, week, month, any)
        #[arg(long, value_delimiter = ',', value_parser = parse_recency)]
        recency: Vec<RecencyFilter>,
    },

    /// Everything, until several pages in a row come back empty
    Exhaustive {
        /// Location to search in
        #[arg(short, long)]
        location: Option<String>,
    },
}

fn parse_sort(s: &str) -> Result<SortOrder, String> {
    SortOrder::from_tag(s).ok_or_else(|| format!("unknown sort order '{}'", s))
}

fn parse_recency(s: &str) -> Result<RecencyFilter, String> {
    RecencyFilter::from_tag(s).ok_or_else(|| format!("unknown recency filter '{}'", s))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let log_file = cli
        .log_file
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));
    let guard = init_logging(cli.verbose, cli.quiet, &log_file)?;
    let log_display = guard
        .log_path
        .as_deref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "the console output".to_string());

    let quiet = cli.quiet;
    match handle_harvest(cli).await {
        Ok(report) => {
            if !quiet {
                print_report(&report);
            }
            if let Some(path) = &report.output_path {
                println!(
                    "Saved {} records to {}",
                    report.records_persisted,
                    path.display()
                );
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {:#}", e);
            eprintln!("Harvest failed: {}. See {} for details.", e, log_display);
            Err(e.into())
        }
    }
}

/// Loads the configuration file, or the defaults without one
fn load_configuration(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        tracing::info!("No configuration file given, using defaults");
        return Ok(Config::default());
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);
    Ok(config)
}

/// Applies command-line overrides and picks the run mode
fn resolve_run(cli: Cli, mut config: Config) -> anyhow::Result<(Config, RunMode)> {
    if let Some(output) = cli.output {
        config.output.directory = output;
    }
    if let Some(workers) = cli.workers {
        config.output.detail_workers = workers as usize;
    }
    if cli.no_details {
        config.output.fetch_details = false;
    }

    let (location, mode) = match cli.command {
        Command::Simple {
            keywords,
            quota,
            location,
        } => (location, RunMode::Simple { keywords, quota }),
        Command::Dimensions {
            quota,
            location,
            sort,
            recency,
        } => {
            let dimensions: Vec<SearchDimension> = SearchDimension::all()
                .into_iter()
                .filter(|d| sort.is_empty() || sort.contains(&d.sort))
                .filter(|d| recency.is_empty() || recency.contains(&d.recency))
                .collect();
            (location, RunMode::Dimensions { quota, dimensions })
        }
        Command::Exhaustive { location } => (location, RunMode::Exhaustive),
    };

    if let Some(location) = location {
        config.search.location = location;
    }

    validate(&config).context("invalid configuration after applying command-line options")?;
    Ok((config, mode))
}

/// Handles the harvest operation
async fn handle_harvest(cli: Cli) -> anyhow::Result<RunReport> {
    let config = load_configuration(cli.config.as_deref())?;
    let (config, mode) = resolve_run(cli, config)?;

    tracing::info!(
        "Mode: {}, location: {}, batch size: {}, detail workers: {}",
        mode.name(),
        config.search.location,
        config.output.batch_size,
        config.output.detail_workers
    );

    let harvester = Harvester::new(config, mode).context("failed to set up the harvester")?;

    let token = harvester.cancellation_token();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if interrupt_action(&token) == InterruptAction::Exit {
                tracing::error!("Second interrupt received, exiting without flushing");
                std::process::exit(130);
            }
            tracing::warn!("Interrupt received, flushing; interrupt again to exit");
        }
    });

    let report = harvester.run().await.context("harvest aborted")?;
    Ok(report)
}

#[derive(Debug, PartialEq, Eq)]
enum InterruptAction {
    /// Cancel the run and let it flush
    Stop,
    /// Already cancelled once; leave immediately
    Exit,
}

fn interrupt_action(token: &CancellationToken) -> InterruptAction {
    if token.is_cancelled() {
        InterruptAction::Exit
    } else {
        token.cancel();
        InterruptAction::Stop
    }
}
