use serde::Deserialize;
use std::time::Duration;

/// Desktop browser user agents rotated across requests
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:122.0) Gecko/20100101 Firefox/122.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
];

/// Main configuration structure for Listing-Harvest
///
/// Every section has defaults, so an empty file (or no file) is a valid
/// configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub search: SearchConfig,
    pub rate_limit: RateLimitConfig,
    pub http: HttpConfig,
    pub output: OutputConfig,
}

/// What to search for and how pages are counted
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SearchConfig {
    pub location: String,

    /// Keywords for simple mode
    pub keywords: Option<String>,

    /// Listings per result page in the remote protocol
    pub page_size: u32,

    /// Consecutive empty pages that end an exhaustive run
    pub max_empty_pages: u32,

    /// Consecutive failed pages that abort a dimension
    pub max_failed_pages: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            location: "Sri Lanka".to_string(),
            keywords: None,
            page_size: 25,
            max_empty_pages: 3,
            max_failed_pages: 3,
        }
    }
}

/// Inclusive millisecond range a random delay is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub fn min(&self) -> Duration {
        Duration::from_millis(self.min_ms)
    }

    pub fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }
}

/// Delay and backoff policy
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RateLimitConfig {
    /// Between successive listing-page fetches
    pub page_delay: DelayRange,

    /// Between search dimensions
    pub dimension_delay: DelayRange,

    /// Between successive detail fetches on one worker
    pub detail_delay: DelayRange,

    /// Fixed part of the wait after HTTP 429 (milliseconds)
    pub backoff_base_ms: u64,

    /// Random part added to the 429 wait
    pub backoff_jitter: DelayRange,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            page_delay: DelayRange::new(2_000, 5_000),
            dimension_delay: DelayRange::new(10_000, 15_000),
            detail_delay: DelayRange::new(500, 1_500),
            backoff_base_ms: 60_000,
            backoff_jitter: DelayRange::new(0, 30_000),
        }
    }
}

/// Remote endpoints and request identity
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HttpConfig {
    pub listing_endpoint: String,

    /// Base URL the identifier is appended to
    pub detail_endpoint: String,

    pub referer: String,

    pub timeout_secs: u64,

    pub connect_timeout_secs: u64,

    pub https_only: bool,

    /// Pool sampled (with replacement) for each request
    pub user_agents: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listing_endpoint:
                "https://www.linkedin.com/jobs-guest/jobs/api/seeMoreJobPostings/search"
                    .to_string(),
            detail_endpoint: "https://www.linkedin.com/jobs-guest/jobs/api/jobPosting/"
                .to_string(),
            referer: "https://www.linkedin.com/".to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            https_only: true,
            user_agents: DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Directory the run's CSV file is created in
    pub directory: String,

    /// Used when the primary directory cannot be written; `None` means the home directory
    pub fallback_directory: Option<String>,

    /// Records buffered before an automatic flush
    pub batch_size: usize,

    /// Concurrent detail fetches; 1 keeps enrichment sequential
    pub detail_workers: usize,

    /// Fetch the detail document for every listing
    pub fetch_details: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "data".to_string(),
            fallback_directory: None,
            batch_size: 50,
            detail_workers: 1,
            fetch_details: true,
        }
    }
}
