//! Time source for delays and backoff
//!
//! All waiting in the pipeline goes through a [`Clock`], so tests can swap in
//! a [`VirtualClock`] that advances instantly instead of sleeping.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Boxed future returned by [`Clock::sleep`]
pub type SleepFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Monotonic time source
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock was created
    fn now(&self) -> Duration;

    /// Waits for `duration`
    fn sleep(&self, duration: Duration) -> SleepFuture<'_>;
}

/// Sleeps on `clock` unless `cancel` fires first
///
/// Returns `false` if the wait was cut short by cancellation.
pub async fn sleep_unless_cancelled(
    clock: &dyn Clock,
    duration: Duration,
    cancel: &CancellationToken,
) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    if duration.is_zero() {
        return true;
    }

    tokio::select! {
        _ = clock.sleep(duration) => true,
        _ = cancel.cancelled() => false,
    }
}

/// Wall-clock implementation backed by `tokio::time::sleep`
#[derive(Debug, Clone)]
pub struct TokioClock {
    origin: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Clock whose time only moves when something sleeps on it
///
/// Every requested sleep is recorded, so tests can assert on the delays the
/// pipeline asked for without waiting for them.
#[derive(Debug, Default)]
pub struct VirtualClock {
    elapsed: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves time forward without recording a sleep
    pub fn advance(&self, duration: Duration) {
        if let Ok(mut elapsed) = self.elapsed.lock() {
            *elapsed += duration;
        }
    }

    /// Every sleep requested so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Sum of all requested sleeps
    pub fn total_slept(&self) -> Duration {
        self.sleeps().iter().sum()
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Duration {
        self.elapsed.lock().map(|e| *e).unwrap_or_default()
    }

    fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
        Box::pin(async move {
            if let Ok(mut sleeps) = self.sleeps.lock() {
                sleeps.push(duration);
            }
            self.advance(duration);
            tokio::task::yield_now().await;
        })
    }
}
