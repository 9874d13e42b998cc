//! Circuit Breaker implementation for fault tolerance
//!
//! The circuit breaker stops a connector from hammering a source that keeps
//! failing. It has three states:
//! - Closed: Normal operation, attempts pass through
//! - Open: Source is unhealthy, attempts are refused until the timeout elapses
//! - HalfOpen: A trial attempt is allowed to probe recovery
//!
//! The OPEN -> HALF_OPEN transition is observed lazily, on the next
//! [`CircuitBreaker::can_attempt`] call after the timeout.

use super::error::ResilienceError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// State of the circuit breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Circuit is closed, attempts pass through normally
    Closed,
    /// Circuit is open, attempts are refused
    Open,
    /// Circuit is half-open, a trial attempt is allowed
    HalfOpen,
}

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening the circuit
    pub failure_threshold: u32,
    /// Time since the last failure before an open circuit allows a trial
    pub timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout: Duration::from_secs(300),
        }
    }
}

impl CircuitBreakerConfig {
    pub fn validate(&self) -> Result<(), ResilienceError> {
        if self.failure_threshold == 0 {
            return Err(ResilienceError::InvalidBreakerConfig(
                "failure_threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Point-in-time view of a breaker, for status reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub failure_count: u32,
    /// Seconds since the most recent failure, if any was recorded
    pub last_failure_seconds_ago: Option<f64>,
}

/// Circuit breaker owned by a single connector
///
/// There is no "trial in progress" gate: while HALF_OPEN every
/// `can_attempt` call returns `true`. Callers that share one breaker between
/// concurrent tasks must serialize their attempts themselves.
///
/// # Example
/// ```
/// use sluice_core_resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut breaker = CircuitBreaker::new(CircuitBreakerConfig {
///     failure_threshold: 2,
///     timeout: Duration::from_secs(30),
/// });
///
/// breaker.record_failure();
/// breaker.record_failure();
/// assert_eq!(breaker.state(), CircuitState::Open);
/// assert!(!breaker.can_attempt());
///
/// breaker.record_success();
/// assert_eq!(breaker.state(), CircuitState::Closed);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: CircuitState,
    failure_count: u32,
    last_failure: Option<Instant>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker in the closed state
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            state: CircuitState::Closed,
            failure_count: 0,
            last_failure: None,
        }
    }

    /// Current state, without evaluating the open timeout
    pub fn state(&self) -> CircuitState {
        self.state
    }

    /// Consecutive failures since the last success
    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    pub fn is_open(&self) -> bool {
        self.state == CircuitState::Open
    }

    /// Any success closes the circuit and clears the failure count
    pub fn record_success(&mut self) {
        if self.state != CircuitState::Closed {
            debug!(previous = ?self.state, "circuit closed after success");
        }
        self.failure_count = 0;
        self.state = CircuitState::Closed;
    }

    /// Count a failure and open the circuit once the threshold is reached
    pub fn record_failure(&mut self) {
        self.failure_count = self.failure_count.saturating_add(1);
        self.last_failure = Some(Instant::now());

        if self.failure_count >= self.config.failure_threshold {
            if self.state != CircuitState::Open {
                debug!(
                    failures = self.failure_count,
                    threshold = self.config.failure_threshold,
                    "circuit opened"
                );
            }
            self.state = CircuitState::Open;
        }
    }

    /// Whether an attempt may proceed now.
    ///
    /// An open circuit whose timeout has elapsed moves to HALF_OPEN here.
    pub fn can_attempt(&mut self) -> bool {
        match self.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = self
                    .last_failure
                    .map(|at| Instant::now().saturating_duration_since(at))
                    .unwrap_or(Duration::MAX);

                if elapsed >= self.config.timeout {
                    self.state = CircuitState::HalfOpen;
                    debug!("circuit half-open, allowing trial attempt");
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        BreakerSnapshot {
            state: self.state,
            failure_count: self.failure_count,
            last_failure_seconds_ago: self
                .last_failure
                .map(|at| Instant::now().saturating_duration_since(at).as_secs_f64()),
        }
    }
}
