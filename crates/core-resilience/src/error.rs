//! Error types for the resilience primitives

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResilienceError {
    #[error("Invalid rate limit: {0}")]
    InvalidRateLimit(String),

    #[error("Invalid circuit breaker configuration: {0}")]
    InvalidBreakerConfig(String),

    #[error("Invalid backoff: {0}")]
    InvalidBackoff(String),
}
