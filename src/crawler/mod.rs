//! Crawler module for listing-page fetching and processing
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching that races a cancellation token
//! - Field extraction from listing cards and detail documents
//! - Delay, backoff and per-request identity
//! - Pagination per search dimension
//! - Overall run coordination

pub mod clock;
mod coordinator;
mod enricher;
mod fetcher;
mod governor;
pub mod heuristics;
mod identity;
mod pagination;
mod parser;

pub use clock::{sleep_unless_cancelled, Clock, SleepFuture, TokioClock, VirtualClock};
pub use coordinator::{run_harvest, Harvester, RunMode};
pub use enricher::{DetailEnricher, DetailOutcome};
pub use fetcher::{build_http_client, fetch_url, FetchResult};
pub use governor::{RateGovernor, Verdict};
pub use identity::{pick_user_agent, request_headers};
pub use pagination::{PageBudget, PageOutcome, PaginationController};
pub use parser::{extract_listing, extract_listings, parse_detail, ListingPage};

use crate::config::Config;
use crate::output::RunReport;
use tokio_util::sync::CancellationToken;

/// Runs a complete harvest that stops gracefully when `cancel` fires
///
/// This is the main entry point for starting a run. It will:
/// 1. Create the run's output file
/// 2. Build the HTTP client and rate governor
/// 3. Page through every dimension of `mode`
/// 4. Enrich and persist each listing in batches
/// 5. Return the run report
///
/// # Arguments
///
/// * `config` - The harvest configuration
/// * `mode` - The run mode
/// * `cancel` - Token that interrupts the run
///
/// # Returns
///
/// * `Ok(RunReport)` - Run completed or was cancelled
/// * `Err(HarvestError)` - Setup failed or no destination accepted a write
pub async fn harvest(
    config: Config,
    mode: RunMode,
    cancel: CancellationToken,
) -> crate::Result<RunReport> {
    Harvester::new(config, mode)?
        .with_cancellation(cancel)
        .run()
        .await
}
