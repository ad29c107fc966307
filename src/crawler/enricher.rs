//! Detail enrichment: fetch and parse one listing's detail document

use crate::config::HttpConfig;
use crate::crawler::clock::{sleep_unless_cancelled, Clock};
use crate::crawler::fetcher::{fetch_url, FetchResult};
use crate::crawler::governor::{RateGovernor, Verdict};
use crate::crawler::parser::parse_detail;
use crate::record::DetailRecord;
use crate::url::Endpoints;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Attempts per detail document; only a 429 earns another attempt
const DETAIL_ATTEMPTS: u32 = 2;

/// What a detail fetch produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailOutcome {
    Parsed(DetailRecord),

    /// Error status, transport failure, or rate limiting that outlasted the retries
    Failed(String),

    Cancelled,
}

impl DetailOutcome {
    /// The parsed record, or the all-absent record on failure
    pub fn into_detail(self) -> DetailRecord {
        match self {
            Self::Parsed(detail) => detail,
            _ => DetailRecord::default(),
        }
    }
}

/// Fetches detail documents on behalf of the worker pool
///
/// Cloning is cheap; every clone shares the client, the governor and the
/// cancellation token, so a 429 seen by one worker pauses all of them.
#[derive(Clone)]
pub struct DetailEnricher {
    client: Client,
    endpoints: Arc<Endpoints>,
    http: Arc<HttpConfig>,
    governor: Arc<RateGovernor>,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
}

impl DetailEnricher {
    pub fn new(
        client: Client,
        endpoints: Arc<Endpoints>,
        http: Arc<HttpConfig>,
        governor: Arc<RateGovernor>,
        clock: Arc<dyn Clock>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            endpoints,
            http,
            governor,
            clock,
            cancel,
        }
    }

    /// Fetches and parses the detail document for `id`
    ///
    /// Never fails; see [`DetailEnricher::fetch`] for the distinction
    /// between a parsed and a failed document.
    pub async fn extract_detail(&self, id: &str) -> DetailRecord {
        self.fetch(id).await.into_detail()
    }

    /// Fetches the detail document for `id`, honoring the shared backoff
    ///
    /// A 429 extends the governor's backoff and the request is retried once
    /// the backoff has passed. Any other failure is logged and reported.
    pub async fn fetch(&self, id: &str) -> DetailOutcome {
        let url = match self.endpoints.detail_url(id) {
            Ok(url) => url,
            Err(e) => return DetailOutcome::Failed(e.to_string()),
        };

        for attempt in 1..=DETAIL_ATTEMPTS {
            if let Some(wait) = self.governor.backoff_remaining(self.clock.now()) {
                tracing::debug!("Detail {} waiting {:?} for backoff", id, wait);
                if !sleep_unless_cancelled(self.clock.as_ref(), wait, &self.cancel).await {
                    return DetailOutcome::Cancelled;
                }
            }

            let headers = self.governor.request_headers(&self.http);
            match fetch_url(&self.client, &url, headers, &self.cancel).await {
                FetchResult::Success { body, .. } => {
                    let detail = parse_detail(&body);
                    if detail.is_empty() {
                        tracing::debug!("Detail {} yielded no fields", id);
                    }
                    return DetailOutcome::Parsed(detail);
                }
                FetchResult::HttpError { status_code } => {
                    let verdict = StatusCode::from_u16(status_code)
                        .map(|status| self.governor.observe(status, self.clock.now()))
                        .unwrap_or(Verdict::Failed);

                    if !matches!(verdict, Verdict::Backoff(_)) {
                        tracing::warn!("Detail {} failed with HTTP {}", id, status_code);
                        return DetailOutcome::Failed(format!("HTTP {}", status_code));
                    }
                    tracing::debug!("Detail {} rate limited (attempt {})", id, attempt);
                }
                FetchResult::NetworkError { error } => {
                    tracing::warn!("Detail {} failed: {}", id, error);
                    return DetailOutcome::Failed(error);
                }
                FetchResult::Cancelled => return DetailOutcome::Cancelled,
            }
        }

        tracing::warn!("Detail {} still rate limited after {} attempts", id, DETAIL_ATTEMPTS);
        DetailOutcome::Failed("rate limited".to_string())
    }

    /// Waits the per-card detail delay; `false` if cancelled meanwhile
    pub async fn pause(&self) -> bool {
        let delay = self.governor.detail_delay();
        sleep_unless_cancelled(self.clock.as_ref(), delay, &self.cancel).await
    }
}
