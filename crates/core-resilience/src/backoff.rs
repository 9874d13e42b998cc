//! Exponential backoff schedule for retry loops
//!
//! The delay before retry `attempt` (0-indexed) is
//! `initial * factor^attempt`, optionally capped.

use super::error::ResilienceError;
use std::time::Duration;

/// Multiplicative backoff schedule
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    /// Delay after the first failed attempt
    pub initial: Duration,
    /// Multiplier applied for each further attempt (>= 1.0)
    pub factor: f64,
    /// Optional ceiling on a single delay
    pub max: Option<Duration>,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            factor: 2.0,
            max: None,
        }
    }
}

impl Backoff {
    pub fn new(initial: Duration, factor: f64) -> Self {
        Self {
            initial,
            factor,
            max: None,
        }
    }

    /// Cap every delay at `max`
    pub fn with_max(mut self, max: Duration) -> Self {
        self.max = Some(max);
        self
    }

    pub fn validate(&self) -> Result<(), ResilienceError> {
        if !self.factor.is_finite() || self.factor < 1.0 {
            return Err(ResilienceError::InvalidBackoff(format!(
                "factor must be >= 1.0, got {}",
                self.factor
            )));
        }
        Ok(())
    }

    /// Delay to wait after the failed attempt with the given 0-based index
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.initial.as_secs_f64() * self.factor.powi(exponent);

        let delay = Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX);

        match self.max {
            Some(max) => delay.min(max),
            None => delay,
        }
    }
}
