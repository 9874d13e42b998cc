//! Rate limiting for preventing source overload
//!
//! A token bucket enforced across three rolling windows (minute, hour, day).
//! Each window is refilled to its maximum lazily, the first time it is
//! consulted after its period has elapsed since the last refill. A token is
//! granted only when every window still has one, and granting it takes one
//! from all three.

use super::error::ResilienceError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(60 * 60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Per-window request budgets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests per rolling minute
    pub per_minute: u32,
    /// Maximum requests per rolling hour
    pub per_hour: u32,
    /// Maximum requests per rolling day
    pub per_day: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_minute: 60,
            per_hour: 1000,
            per_day: 10_000,
        }
    }
}

impl RateLimitConfig {
    /// Reject budgets that could never grant a token
    pub fn validate(&self) -> Result<(), ResilienceError> {
        for (label, value) in [
            ("per_minute", self.per_minute),
            ("per_hour", self.per_hour),
            ("per_day", self.per_day),
        ] {
            if value == 0 {
                return Err(ResilienceError::InvalidRateLimit(format!(
                    "{} must be greater than 0",
                    label
                )));
            }
        }
        Ok(())
    }
}

/// One refilling bucket
#[derive(Debug, Clone)]
struct TokenWindow {
    capacity: u32,
    tokens: u32,
    period: Duration,
    last_reset: Instant,
}

impl TokenWindow {
    fn new(capacity: u32, period: Duration, now: Instant) -> Self {
        Self {
            capacity,
            tokens: capacity,
            period,
            last_reset: now,
        }
    }

    fn refill_if_elapsed(&mut self, now: Instant) {
        if now.saturating_duration_since(self.last_reset) >= self.period {
            self.tokens = self.capacity;
            self.last_reset = now;
        }
    }

    fn time_until_refill(&self, now: Instant) -> Duration {
        self.period
            .saturating_sub(now.saturating_duration_since(self.last_reset))
    }
}

/// Remaining tokens per window, for status reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitSnapshot {
    pub minute: u32,
    pub hour: u32,
    pub day: u32,
}

/// Three-window token bucket owned by a single connector
///
/// # Example
/// ```
/// use sluice_core_resilience::{RateLimiter, RateLimitConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut limiter = RateLimiter::new(RateLimitConfig {
///     per_minute: 2,
///     per_hour: 100,
///     per_day: 1000,
/// });
///
/// assert!(limiter.acquire());
/// assert!(limiter.acquire());
/// assert!(!limiter.acquire());
/// assert!(limiter.wait_time() > std::time::Duration::ZERO);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RateLimiter {
    minute: TokenWindow,
    hour: TokenWindow,
    day: TokenWindow,
}

impl RateLimiter {
    /// Create a limiter with all three buckets full
    pub fn new(config: RateLimitConfig) -> Self {
        let now = Instant::now();
        Self {
            minute: TokenWindow::new(config.per_minute, MINUTE, now),
            hour: TokenWindow::new(config.per_hour, HOUR, now),
            day: TokenWindow::new(config.per_day, DAY, now),
        }
    }

    /// Try to take one token from every window.
    ///
    /// Returns `false` and leaves the counts untouched if any window is empty.
    pub fn acquire(&mut self) -> bool {
        self.refill(Instant::now());

        if self.minute.tokens > 0 && self.hour.tokens > 0 && self.day.tokens > 0 {
            self.minute.tokens -= 1;
            self.hour.tokens -= 1;
            self.day.tokens -= 1;
            true
        } else {
            false
        }
    }

    /// Time until the first exhausted window (minute, hour, day) refills.
    ///
    /// Zero when no window is exhausted.
    pub fn wait_time(&mut self) -> Duration {
        let now = Instant::now();
        self.refill(now);

        [&self.minute, &self.hour, &self.day]
            .into_iter()
            .find(|window| window.tokens == 0)
            .map(|window| window.time_until_refill(now))
            .unwrap_or(Duration::ZERO)
    }

    /// Remaining tokens per window, without refilling
    pub fn snapshot(&self) -> RateLimitSnapshot {
        RateLimitSnapshot {
            minute: self.minute.tokens,
            hour: self.hour.tokens,
            day: self.day.tokens,
        }
    }

    fn refill(&mut self, now: Instant) {
        self.minute.refill_if_elapsed(now);
        self.hour.refill_if_elapsed(now);
        self.day.refill_if_elapsed(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(per_minute: u32, per_hour: u32, per_day: u32) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            per_minute,
            per_hour,
            per_day,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_minute_budget_exhausts_after_n_acquires() {
        let mut limiter = limiter(5, 100, 1000);

        for _ in 0..5 {
            assert!(limiter.acquire());
        }
        assert!(!limiter.acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_acquire_leaves_counts_untouched() {
        let mut limiter = limiter(1, 100, 1000);

        assert!(limiter.acquire());
        let before = limiter.snapshot();
        assert!(!limiter.acquire());
        assert_eq!(limiter.snapshot(), before);
        assert_eq!(before.hour, 99);
    }

    #[tokio::test(start_paused = true)]
    async fn test_minute_window_refills() {
        let mut limiter = limiter(2, 100, 1000);

        assert!(limiter.acquire());
        assert!(limiter.acquire());
        assert!(!limiter.acquire());

        tokio::time::advance(Duration::from_secs(61)).await;

        assert!(limiter.acquire());
        let snapshot = limiter.snapshot();
        assert_eq!(snapshot.minute, 1);
        // Hour and day keep their consumption across the minute refill
        assert_eq!(snapshot.hour, 97);
        assert_eq!(snapshot.day, 997);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hour_window_blocks_even_with_minute_tokens() {
        let mut limiter = limiter(10, 2, 1000);

        assert!(limiter.acquire());
        assert!(limiter.acquire());
        assert!(!limiter.acquire());

        tokio::time::advance(Duration::from_secs(120)).await;
        assert!(!limiter.acquire());

        let wait = limiter.wait_time();
        assert!(wait > Duration::from_secs(3000));
        assert!(wait <= HOUR);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_time_zero_while_tokens_remain() {
        let mut limiter = limiter(3, 100, 1000);

        assert!(limiter.acquire());
        assert_eq!(limiter.wait_time(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_time_counts_down_to_minute_refill() {
        let mut limiter = limiter(1, 100, 1000);

        assert!(limiter.acquire());
        assert_eq!(limiter.wait_time(), MINUTE);

        tokio::time::advance(Duration::from_secs(45)).await;
        assert_eq!(limiter.wait_time(), Duration::from_secs(15));

        tokio::time::advance(Duration::from_secs(15)).await;
        assert_eq!(limiter.wait_time(), Duration::ZERO);
        assert!(limiter.acquire());
    }

    #[test]
    fn test_config_validation() {
        assert!(RateLimitConfig::default().validate().is_ok());

        let config = RateLimitConfig {
            per_hour: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ResilienceError::InvalidRateLimit(msg)) if msg.contains("per_hour")
        ));
    }
}
