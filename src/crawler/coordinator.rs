//! Harvest coordinator - main pipeline orchestration logic
//!
//! This module contains the main harvest loop that coordinates all aspects of
//! a run, including:
//! - Creating the run's output file up front
//! - Walking each search dimension page by page
//! - Enriching listings through a bounded detail worker pool
//! - Flushing at dimension boundaries and on cancellation
//! - Producing the run report

use crate::config::{Config, SearchConfig};
use crate::crawler::clock::{sleep_unless_cancelled, Clock, TokioClock};
use crate::crawler::enricher::{DetailEnricher, DetailOutcome};
use crate::crawler::fetcher::{build_http_client, fetch_url, FetchResult};
use crate::crawler::governor::{RateGovernor, Verdict};
use crate::crawler::pagination::{PageBudget, PageOutcome, PaginationController};
use crate::crawler::parser::extract_listings;
use crate::output::RunReport;
use crate::record::{DetailRecord, EnrichedRecord, ListingRecord};
use crate::state::{DimensionStatus, SearchDimension};
use crate::storage::{CsvSink, CsvWriter, IncrementalWriter, Schema, StorageError};
use crate::url::{Endpoints, SearchQuery};
use crate::Result;
use chrono::{DateTime, Local};
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

type SharedWriter = Arc<Mutex<CsvWriter>>;

/// What a run searches for and how far it pages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// One unfiltered search, `ceil(quota / page_size)` pages
    Simple { keywords: Option<String>, quota: u32 },

    /// Every listed dimension, each with its own page budget; rows are tagged
    Dimensions {
        quota: u32,
        dimensions: Vec<SearchDimension>,
    },

    /// One unfiltered search until enough consecutive empty pages
    Exhaustive,
}

impl RunMode {
    /// Dimensions mode over all twelve combinations
    pub fn all_dimensions(quota: u32) -> Self {
        Self::Dimensions {
            quota,
            dimensions: SearchDimension::all(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Simple { .. } => "simple",
            Self::Dimensions { .. } => "dimensions",
            Self::Exhaustive => "exhaustive",
        }
    }

    /// Dimensions visited, in order
    pub fn dimensions(&self) -> Vec<SearchDimension> {
        match self {
            Self::Dimensions { dimensions, .. } => dimensions.clone(),
            _ => vec![SearchDimension::unfiltered()],
        }
    }

    /// Page budget applied to each dimension
    pub fn budget(&self, search: &SearchConfig) -> PageBudget {
        match self {
            Self::Simple { quota, .. } | Self::Dimensions { quota, .. } => {
                PageBudget::for_quota(*quota, search.page_size)
            }
            Self::Exhaustive => PageBudget::UntilEmpty {
                max_empty_pages: search.max_empty_pages,
            },
        }
    }

    /// Only dimension runs send sort and filter parameters
    pub fn is_filtered(&self) -> bool {
        matches!(self, Self::Dimensions { .. })
    }

    /// Only dimension runs carry the sort and filter columns
    pub fn schema(&self) -> Schema {
        match self {
            Self::Dimensions { .. } => Schema::Tagged,
            _ => Schema::Plain,
        }
    }

    /// Keywords sent with every page; simple mode's own keywords win
    pub fn keywords(&self, search: &SearchConfig) -> Option<String> {
        match self {
            Self::Simple {
                keywords: Some(keywords),
                ..
            } => Some(keywords.clone()),
            _ => search.keywords.clone(),
        }
    }
}

/// Main harvest coordinator structure
pub struct Harvester {
    config: Config,
    mode: RunMode,
    client: Client,
    endpoints: Arc<Endpoints>,
    governor: Arc<RateGovernor>,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
    started: DateTime<Local>,
}

impl Harvester {
    /// Creates a new harvester instance
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `mode` - What to search for and how far to page
    ///
    /// # Returns
    ///
    /// * `Ok(Harvester)` - Ready to run
    /// * `Err(HarvestError)` - An endpoint is malformed or the HTTP client failed to build
    pub fn new(config: Config, mode: RunMode) -> Result<Self> {
        let endpoints = Endpoints::new(
            &config.http.listing_endpoint,
            &config.http.detail_endpoint,
        )?;
        let client = build_http_client(&config.http)?;
        let governor = RateGovernor::new(config.rate_limit.clone());

        Ok(Self {
            config,
            mode,
            client,
            endpoints: Arc::new(endpoints),
            governor: Arc::new(governor),
            clock: Arc::new(TokioClock::new()),
            cancel: CancellationToken::new(),
            started: Local::now(),
        })
    }

    /// Replaces the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Seeds the delay and user-agent draws
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.governor = Arc::new(RateGovernor::with_seed(self.config.rate_limit.clone(), seed));
        self
    }

    /// Uses an externally owned cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops the run gracefully when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn mode(&self) -> &RunMode {
        &self.mode
    }

    /// Runs the pipeline to completion or cancellation
    ///
    /// Network failures, rate limiting and markup mismatches are absorbed
    /// into the report. Only a write that fails on both the primary and the
    /// fallback destination ends the run with an error.
    pub async fn run(self) -> Result<RunReport> {
        let schema = self.mode.schema();
        let sink = CsvSink::for_run(schema, &self.config.output, self.started);
        let mut writer = IncrementalWriter::new(sink, self.config.output.batch_size);
        writer.initialize()?;
        let writer: SharedWriter = Arc::new(Mutex::new(writer));

        let enricher = DetailEnricher::new(
            self.client.clone(),
            Arc::clone(&self.endpoints),
            Arc::new(self.config.http.clone()),
            Arc::clone(&self.governor),
            Arc::clone(&self.clock),
            self.cancel.clone(),
        );

        let dimensions = self.mode.dimensions();
        tracing::info!(
            "Starting {} harvest over {} dimension(s)",
            self.mode.name(),
            dimensions.len()
        );

        let mut report = RunReport::default();
        for (index, dimension) in dimensions.iter().enumerate() {
            if index > 0 {
                let pause = self.governor.dimension_delay();
                tracing::debug!("Pausing {:?} before next dimension", pause);
                if !sleep_unless_cancelled(self.clock.as_ref(), pause, &self.cancel).await {
                    break;
                }
            }
            if self.cancel.is_cancelled() {
                break;
            }

            let status = self
                .harvest_dimension(*dimension, &enricher, &writer, &mut report)
                .await?;

            match status {
                DimensionStatus::Exhausted => report.dimensions_exhausted += 1,
                DimensionStatus::Aborted => report.dimensions_aborted += 1,
                DimensionStatus::Fetching(_) => {}
            }

            writer.lock().await.flush()?;
            tracing::info!("Finished {} ({:?})", dimension, status);

            if self.cancel.is_cancelled() {
                break;
            }
        }

        let stats = writer.lock().await.close()?;
        report.records_persisted = stats.persisted as u64;
        report.flushes = stats.flushes as u64;
        report.output_path = Some(stats.location);
        report.rate_limited = self.governor.rate_limited_count();
        report.cancelled = self.cancel.is_cancelled();

        if report.cancelled {
            tracing::warn!(
                "Harvest cancelled; {} records persisted",
                report.records_persisted
            );
        } else {
            tracing::info!(
                "Harvest complete: {} records persisted",
                report.records_persisted
            );
        }

        Ok(report)
    }

    /// Walks one dimension until its controller reaches a terminal state
    async fn harvest_dimension(
        &self,
        dimension: SearchDimension,
        enricher: &DetailEnricher,
        writer: &SharedWriter,
        report: &mut RunReport,
    ) -> Result<DimensionStatus> {
        let budget = self.mode.budget(&self.config.search);
        let mut controller =
            PaginationController::new(dimension, budget, self.config.search.max_failed_pages);
        let query = SearchQuery {
            keywords: self.mode.keywords(&self.config.search),
            location: self.config.search.location.clone(),
            filtered: self.mode.is_filtered(),
        };
        let page_size = self.config.search.page_size;

        tracing::info!("Harvesting {} with {:?}", dimension, budget);

        let mut first_page = true;
        while let Some(cursor) = controller.next_cursor() {
            let now = self.clock.now();
            let delay = if first_page {
                self.governor.backoff_remaining(now).unwrap_or(Duration::ZERO)
            } else {
                self.governor.next_delay(now)
            };
            first_page = false;

            if !sleep_unless_cancelled(self.clock.as_ref(), delay, &self.cancel).await {
                controller.abort();
                break;
            }

            let url = self.endpoints.listing_url(&query, &cursor, page_size);
            tracing::debug!("Fetching {}", url);

            let headers = self.governor.request_headers(&self.config.http);
            let outcome = match fetch_url(&self.client, &url, headers, &self.cancel).await {
                FetchResult::Success { body, .. } => {
                    report.pages_fetched += 1;

                    let page = extract_listings(&body);
                    report.listings_extracted += page.records.len() as u64;
                    report.fragments_rejected += page.rejected as u64;
                    if page.rejected > 0 {
                        tracing::warn!(
                            "{}: rejected {} card(s) without a listing link",
                            cursor,
                            page.rejected
                        );
                    }
                    tracing::info!("{}: {} listings", cursor, page.records.len());

                    let fragments = page.fragments;
                    self.enrich_page(page.records, dimension, enricher, writer, report)
                        .await?;
                    PageOutcome::Listings(fragments)
                }
                FetchResult::HttpError { status_code } => {
                    let verdict = StatusCode::from_u16(status_code)
                        .map(|status| self.governor.observe(status, self.clock.now()))
                        .unwrap_or(Verdict::Failed);

                    match verdict {
                        Verdict::Backoff(_) => PageOutcome::RateLimited,
                        _ => {
                            report.pages_failed += 1;
                            tracing::error!("{}: HTTP {}, skipping page", cursor, status_code);
                            PageOutcome::Failed
                        }
                    }
                }
                FetchResult::NetworkError { error } => {
                    report.pages_failed += 1;
                    tracing::error!("{}: {}, skipping page", cursor, error);
                    PageOutcome::Failed
                }
                FetchResult::Cancelled => {
                    controller.abort();
                    break;
                }
            };

            if controller.record(outcome) == DimensionStatus::Aborted {
                tracing::warn!("{}: too many failed pages, giving up on dimension", cursor);
            }
        }

        Ok(controller.status())
    }

    /// Enriches one page's listings and appends them to the writer
    ///
    /// Detail fetches run on at most `detail-workers` tasks. Records are
    /// appended as their worker finishes, so with more than one worker the
    /// order within a page is not preserved.
    async fn enrich_page(
        &self,
        listings: Vec<ListingRecord>,
        dimension: SearchDimension,
        enricher: &DetailEnricher,
        writer: &SharedWriter,
        report: &mut RunReport,
    ) -> Result<()> {
        let tag = match self.mode {
            RunMode::Dimensions { .. } => Some(dimension),
            _ => None,
        };

        if !self.config.output.fetch_details {
            let mut writer = writer.lock().await;
            for listing in listings {
                writer.append(EnrichedRecord::new(listing, DetailRecord::default(), tag))?;
            }
            return Ok(());
        }

        let semaphore = Arc::new(Semaphore::new(self.config.output.detail_workers.max(1)));
        let mut workers = JoinSet::new();

        for listing in listings {
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            let enricher = enricher.clone();
            let writer = Arc::clone(writer);

            workers.spawn(async move {
                let outcome = enricher.fetch(&listing.id).await;
                let failed = matches!(outcome, DetailOutcome::Failed(_));
                enricher.pause().await;

                let record = EnrichedRecord::new(listing, outcome.into_detail(), tag);
                let appended = writer.lock().await.append(record).map(|_| ());
                drop(permit);
                (failed, appended)
            });
        }

        let mut fatal: Option<StorageError> = None;
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((failed, appended)) => {
                    if failed {
                        report.details_failed += 1;
                    }
                    if let Err(e) = appended {
                        fatal.get_or_insert(e);
                    }
                }
                Err(e) => tracing::error!("Detail worker panicked: {}", e),
            }
        }

        match fatal {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

/// Runs a complete harvest
///
/// # Example
///
/// ```no_run
/// use listing_harvest::config::Config;
/// use listing_harvest::crawler::{run_harvest, RunMode};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mode = RunMode::Simple { keywords: Some("rust".to_string()), quota: 50 };
/// let report = run_harvest(Config::default(), mode).await?;
/// println!("{} records", report.records_persisted);
/// # Ok(())
/// # }
/// ```
pub async fn run_harvest(config: Config, mode: RunMode) -> Result<RunReport> {
    Harvester::new(config, mode)?.run().await
}
