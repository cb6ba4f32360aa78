//! Two-tier rate limiter for outbound AniDB traffic
//!
//! AniDB allows at most one packet every two seconds in the short term and
//! one every four seconds over an extended period, and bans clients that
//! ignore this. The limiter serializes every request behind a single lock
//! that is held across the delay and the network call itself.

use log::trace;
use std::future::Future;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::{Instant, sleep};

/// Added on top of the computed wait
const SAFETY_MARGIN: Duration = Duration::from_millis(50);

/// Rate limiter tunables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Minimum spacing while the client is in its burst window
    pub short_delay: Duration,
    /// Minimum spacing once the client has been active for `short_period`
    pub long_delay: Duration,
    /// Continuous activity after which `long_delay` applies
    pub short_period: Duration,
    /// Idle time after which the activity window restarts
    pub reset_period: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            short_delay: Duration::from_millis(2500),
            long_delay: Duration::from_millis(4000),
            short_period: Duration::from_secs(60 * 60),
            reset_period: Duration::from_secs(30 * 60),
        }
    }
}

#[derive(Debug, Default)]
struct RateState {
    /// When the previous request finished
    last_request: Option<Instant>,
    /// Start of the current continuous activity window
    active_since: Option<Instant>,
}

/// Stamps the request clock when the gated call ends, however it ends.
struct GateGuard<'a> {
    state: MutexGuard<'a, RateState>,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        self.state.last_request = Some(Instant::now());
    }
}

/// Rate limiter for a single remote endpoint
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Mutex<RateState>,
}

impl RateLimiter {
    /// Create a limiter with the given tunables
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: Mutex::new(RateState::default()),
        }
    }

    /// Get the limiter configuration
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Run `action` once the rate limit allows it.
    ///
    /// Only one action runs at a time. `force_short_delay` keeps the short
    /// tier even when the client has been active long enough for the long
    /// one. The request clock advances when the action completes, fails, or
    /// is cancelled by the caller dropping the returned future.
    pub async fn gate<F, Fut, T>(&self, action: F, force_short_delay: bool) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        trace!("Rate limiter: acquiring lock...");
        let mut guard = GateGuard {
            state: self.state.lock().await,
        };
        trace!("Rate limiter: lock acquired");

        if let Some(wait) = self.plan(&mut guard.state, Instant::now(), force_short_delay) {
            sleep(wait).await;
        }

        trace!("Sending AniDB command");
        action().await
    }

    /// Delay tier the next request would be held to
    pub async fn current_delay(&self, force_short_delay: bool) -> Duration {
        let state = self.state.lock().await;
        let now = Instant::now();
        let idle_reset = state
            .last_request
            .is_none_or(|last| now.saturating_duration_since(last) > self.config.reset_period);
        if idle_reset {
            self.config.short_delay
        } else {
            self.tier(&state, now, force_short_delay)
        }
    }

    /// Update the activity window and work out how long to wait, if at all
    fn plan(&self, state: &mut RateState, now: Instant, force_short_delay: bool) -> Option<Duration> {
        let Some(last) = state.last_request else {
            trace!("No previous request, not throttling");
            state.active_since = Some(now);
            return None;
        };

        let elapsed = now.saturating_duration_since(last);
        if elapsed > self.config.reset_period {
            let active = state
                .active_since
                .map(|since| now.saturating_duration_since(since))
                .unwrap_or_default();
            state.active_since = Some(now);
            trace!("Rate is reset. Active time was {active:?}");
        }

        let current_delay = self.tier(state, now, force_short_delay);
        if elapsed > current_delay {
            trace!("Time since last request is {elapsed:?}, not throttling");
            return None;
        }

        let wait = current_delay - elapsed + SAFETY_MARGIN;
        trace!("Time since last request is {elapsed:?}, throttling for {wait:?}");
        Some(wait)
    }

    fn tier(&self, state: &RateState, now: Instant, force_short_delay: bool) -> Duration {
        let active = state
            .active_since
            .map(|since| now.saturating_duration_since(since))
            .unwrap_or_default();
        if !force_short_delay && active > self.config.short_period {
            self.config.long_delay
        } else {
            self.config.short_delay
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> RateLimitConfig {
        RateLimitConfig {
            short_delay: Duration::from_millis(100),
            long_delay: Duration::from_millis(300),
            short_period: Duration::from_secs(1),
            reset_period: Duration::from_secs(10),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_request_is_immediate() {
        let limiter = RateLimiter::new(fast_config());
        let start = Instant::now();
        let started = limiter.gate(|| async { Instant::now() }, false).await;
        assert_eq!(started, start);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_request_waits_short_delay_plus_margin() {
        let limiter = RateLimiter::new(fast_config());
        let first = limiter.gate(|| async { Instant::now() }, false).await;
        let second = limiter.gate(|| async { Instant::now() }, false).await;
        assert_eq!(second - first, Duration::from_millis(150));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_after_delay_elapsed() {
        let limiter = RateLimiter::new(fast_config());
        limiter.gate(|| async {}, false).await;
        sleep(Duration::from_millis(200)).await;

        let before = Instant::now();
        let started = limiter.gate(|| async { Instant::now() }, false).await;
        assert_eq!(started, before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_current_delay_starts_short() {
        let limiter = RateLimiter::new(fast_config());
        assert_eq!(limiter.current_delay(false).await, Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_short_delay_ignores_escalation() {
        let limiter = RateLimiter::new(fast_config());
        for _ in 0..10 {
            limiter.gate(|| async {}, false).await;
        }
        assert_eq!(limiter.current_delay(false).await, Duration::from_millis(300));
        assert_eq!(limiter.current_delay(true).await, Duration::from_millis(100));

        let before = Instant::now();
        let started = limiter.gate(|| async { Instant::now() }, true).await;
        assert_eq!(started - before, Duration::from_millis(150));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_action_still_advances_clock() {
        let limiter = RateLimiter::new(fast_config());
        let result: std::result::Result<(), &str> = limiter.gate(|| async { Err("boom") }, false).await;
        assert!(result.is_err());

        let before = Instant::now();
        let started = limiter.gate(|| async { Instant::now() }, false).await;
        assert_eq!(started - before, Duration::from_millis(150));
    }
}
