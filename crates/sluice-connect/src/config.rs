//! Connector configuration
//!
//! One immutable `ConnectorConfig` per connector instance. Reconfiguring a
//! connector means building a new one.

use crate::error::ConnectorError;
use serde::{Deserialize, Serialize};
use sluice_core_resilience::{Backoff, CircuitBreakerConfig, RateLimitConfig};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Identifier, unique within a manager
    pub name: String,

    /// Disabled connectors never poll
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_per_minute")]
    pub max_requests_per_minute: u32,

    #[serde(default = "default_per_hour")]
    pub max_requests_per_hour: u32,

    #[serde(default = "default_per_day")]
    pub max_requests_per_day: u32,

    /// Fetch attempts per poll cycle
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay")]
    pub retry_delay_seconds: f64,

    /// Multiplier applied to the retry delay per attempt
    #[serde(default = "default_backoff_factor")]
    pub retry_backoff_factor: f64,

    /// Consecutive failed cycles before the circuit opens
    #[serde(default = "default_breaker_threshold")]
    pub circuit_breaker_threshold: u32,

    /// Seconds an open circuit waits before allowing a trial cycle
    #[serde(default = "default_breaker_timeout")]
    pub circuit_breaker_timeout_seconds: f64,

    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_seconds: f64,

    #[serde(default = "default_read_timeout")]
    pub read_timeout_seconds: f64,

    /// Pause between the end of one cycle and the start of the next
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: f64,

    /// Wait applied when the source answers 429
    #[serde(default = "default_cooldown")]
    pub rate_limit_cooldown_seconds: f64,

    /// Longest single sleep while waiting for a rate limiter token
    #[serde(default = "default_max_token_wait")]
    pub max_rate_limit_wait_seconds: f64,
}

fn default_true() -> bool {
    true
}
fn default_per_minute() -> u32 {
    60
}
fn default_per_hour() -> u32 {
    1000
}
fn default_per_day() -> u32 {
    10_000
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay() -> f64 {
    1.0
}
fn default_backoff_factor() -> f64 {
    2.0
}
fn default_breaker_threshold() -> u32 {
    5
}
fn default_breaker_timeout() -> f64 {
    300.0
}
fn default_connection_timeout() -> f64 {
    30.0
}
fn default_read_timeout() -> f64 {
    60.0
}
fn default_poll_interval() -> f64 {
    300.0
}
fn default_cooldown() -> f64 {
    60.0
}
fn default_max_token_wait() -> f64 {
    60.0
}

impl ConnectorConfig {
    /// Configuration with every knob at its default
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            max_requests_per_minute: default_per_minute(),
            max_requests_per_hour: default_per_hour(),
            max_requests_per_day: default_per_day(),
            max_retries: default_max_retries(),
            retry_delay_seconds: default_retry_delay(),
            retry_backoff_factor: default_backoff_factor(),
            circuit_breaker_threshold: default_breaker_threshold(),
            circuit_breaker_timeout_seconds: default_breaker_timeout(),
            connection_timeout_seconds: default_connection_timeout(),
            read_timeout_seconds: default_read_timeout(),
            poll_interval_seconds: default_poll_interval(),
            rate_limit_cooldown_seconds: default_cooldown(),
            max_rate_limit_wait_seconds: default_max_token_wait(),
        }
    }

    /// Check the ranges every field must respect
    pub fn validate(&self) -> Result<(), ConnectorError> {
        if self.name.trim().is_empty() {
            return Err(ConnectorError::InvalidConfig(
                "name must not be empty".to_string(),
            ));
        }

        self.rate_limit().validate()?;
        self.backoff().validate()?;
        self.circuit_breaker().validate()?;

        if self.max_retries == 0 {
            return Err(self.invalid("max_retries must be at least 1"));
        }
        if !(self.retry_delay_seconds > 0.0) {
            return Err(self.invalid("retry_delay_seconds must be positive"));
        }

        for (field, value) in [
            (
                "circuit_breaker_timeout_seconds",
                self.circuit_breaker_timeout_seconds,
            ),
            ("connection_timeout_seconds", self.connection_timeout_seconds),
            ("read_timeout_seconds", self.read_timeout_seconds),
            ("poll_interval_seconds", self.poll_interval_seconds),
            ("rate_limit_cooldown_seconds", self.rate_limit_cooldown_seconds),
            ("max_rate_limit_wait_seconds", self.max_rate_limit_wait_seconds),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(self.invalid(&format!("{} must be a non-negative number", field)));
            }
        }

        Ok(())
    }

    fn invalid(&self, reason: &str) -> ConnectorError {
        ConnectorError::InvalidConfig(format!("connector '{}': {}", self.name, reason))
    }

    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            per_minute: self.max_requests_per_minute,
            per_hour: self.max_requests_per_hour,
            per_day: self.max_requests_per_day,
        }
    }

    pub fn circuit_breaker(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.circuit_breaker_threshold,
            timeout: seconds(self.circuit_breaker_timeout_seconds),
        }
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(seconds(self.retry_delay_seconds), self.retry_backoff_factor)
    }

    pub fn poll_interval(&self) -> Duration {
        seconds(self.poll_interval_seconds)
    }

    pub fn connection_timeout(&self) -> Duration {
        seconds(self.connection_timeout_seconds)
    }

    pub fn read_timeout(&self) -> Duration {
        seconds(self.read_timeout_seconds)
    }

    pub fn rate_limit_cooldown(&self) -> Duration {
        seconds(self.rate_limit_cooldown_seconds)
    }

    pub fn max_rate_limit_wait(&self) -> Duration {
        seconds(self.max_rate_limit_wait_seconds)
    }
}

/// Lossy conversion for configured seconds; negative or NaN becomes zero
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(if value > 0.0 {
        Duration::MAX
    } else {
        Duration::ZERO
    })
}
