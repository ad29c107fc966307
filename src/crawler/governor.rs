//! Rate governor: inter-request delays and 429 backoff
//!
//! The governor decides how long to wait before the next request. Baseline
//! delays are random draws from configured ranges. An HTTP 429 sets a shared
//! backoff deadline (`base + jitter` from the moment it was seen) that every
//! caller holding the same governor honors, so one rate-limited detail worker
//! pauses all of them.

use crate::config::{DelayRange, HttpConfig, RateLimitConfig};
use crate::crawler::identity::request_headers;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// How the caller should treat a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// 2xx: use the body
    Proceed,

    /// 429: wait this long, then retry the same request
    Backoff(Duration),

    /// Any other status: give up on this request
    Failed,
}

struct GovernorState {
    rng: StdRng,

    /// Clock time before which no request should be sent
    backoff_until: Option<Duration>,

    rate_limited: u64,
}

/// Shared delay and backoff policy
pub struct RateGovernor {
    config: RateLimitConfig,
    state: Mutex<GovernorState>,
}

impl RateGovernor {
    /// Creates a governor seeded from OS entropy
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Creates a governor with a fixed seed, for reproducible delays
    pub fn with_seed(config: RateLimitConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: RateLimitConfig, rng: StdRng) -> Self {
        Self {
            config,
            state: Mutex::new(GovernorState {
                rng,
                backoff_until: None,
                rate_limited: 0,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, GovernorState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Classifies a response status and updates the backoff state
    ///
    /// A 429 extends the shared backoff deadline to `now + base + jitter`; an
    /// already later deadline is kept.
    pub fn observe(&self, status: StatusCode, now: Duration) -> Verdict {
        if status.is_success() {
            return Verdict::Proceed;
        }

        if status != StatusCode::TOO_MANY_REQUESTS {
            return Verdict::Failed;
        }

        let mut state = self.state();
        let jitter = draw(&mut state.rng, &self.config.backoff_jitter);
        let delay = Duration::from_millis(self.config.backoff_base_ms) + jitter;
        let until = now + delay;

        state.rate_limited += 1;
        state.backoff_until = Some(match state.backoff_until {
            Some(existing) if existing > until => existing,
            _ => until,
        });

        tracing::warn!("Rate limited (HTTP 429), backing off for {:?}", delay);
        Verdict::Backoff(delay)
    }

    /// Time left on the shared backoff, if one is pending
    pub fn backoff_remaining(&self, now: Duration) -> Option<Duration> {
        let mut state = self.state();
        match state.backoff_until {
            Some(until) if until > now => Some(until - now),
            Some(_) => {
                state.backoff_until = None;
                None
            }
            None => None,
        }
    }

    /// Delay before the next listing-page fetch
    ///
    /// The remaining backoff when one is pending, otherwise a random draw
    /// from the page-delay range.
    pub fn next_delay(&self, now: Duration) -> Duration {
        if let Some(remaining) = self.backoff_remaining(now) {
            return remaining;
        }
        let mut state = self.state();
        draw(&mut state.rng, &self.config.page_delay)
    }

    /// Pause between two search dimensions
    pub fn dimension_delay(&self) -> Duration {
        let mut state = self.state();
        draw(&mut state.rng, &self.config.dimension_delay)
    }

    /// Pause between two detail fetches on one worker
    pub fn detail_delay(&self) -> Duration {
        let mut state = self.state();
        draw(&mut state.rng, &self.config.detail_delay)
    }

    /// Headers for one request, with a freshly sampled user agent
    pub fn request_headers(&self, http: &HttpConfig) -> HeaderMap {
        let mut state = self.state();
        request_headers(&mut state.rng, &http.user_agents, &http.referer)
    }

    /// Number of 429 responses observed so far
    pub fn rate_limited_count(&self) -> u64 {
        self.state().rate_limited
    }
}

/// Uniform draw from an inclusive millisecond range
fn draw<R: Rng + ?Sized>(rng: &mut R, range: &DelayRange) -> Duration {
    if range.min_ms >= range.max_ms {
        return range.min();
    }
    Duration::from_millis(rng.gen_range(range.min_ms..=range.max_ms))
}
