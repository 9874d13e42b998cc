//! Sluice Core Resilience: Pure-logic fault tolerance primitives
//!
//! # Overview
//!
//! This crate provides the building blocks each ingestion connector uses to
//! protect itself and the sources it polls:
//!
//! - **Rate Limiter**: Token buckets across minute/hour/day windows
//! - **Circuit Breaker**: CLOSED/OPEN/HALF_OPEN failure isolation
//! - **Backoff**: Multiplicative retry delays
//!
//! # Key Principles
//!
//! This crate is **pure logic** with zero knowledge of:
//! - Transports (HTTP, message buses)
//! - Scheduling (callers decide when to sleep)
//!
//! Every primitive is a plain value with `&mut self` methods. A connector
//! owns its own instances, so no locking happens here.
//!
//! # Architecture
//!
//! ```text
//!         Poll cycle
//!              │
//!              ▼
//! ┌─────────────────────────────────────────┐
//! │       Circuit Breaker                   │  ← Skip cycle while OPEN
//! │  (Counts failures, opens on threshold)  │
//! └─────────────┬───────────────────────────┘
//!               │
//!               ▼
//! ┌─────────────────────────────────────────┐
//! │       Rate Limiter                      │  ← Wait for a token
//! │  (minute / hour / day buckets)          │
//! └─────────────┬───────────────────────────┘
//!               │
//!               ▼
//! ┌─────────────────────────────────────────┐
//! │       Backoff                           │  ← Delay between retries
//! │  (initial * factor^attempt)             │
//! └─────────────┬───────────────────────────┘
//!               │
//!               ▼
//!         External Source
//! ```
//!
//! # Usage Example
//!
//! ```
//! use sluice_core_resilience::prelude::*;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut breaker = CircuitBreaker::new(CircuitBreakerConfig {
//!     failure_threshold: 3,
//!     timeout: Duration::from_secs(60),
//! });
//! let mut limiter = RateLimiter::new(RateLimitConfig::default());
//! let backoff = Backoff::new(Duration::from_secs(1), 2.0);
//!
//! if breaker.can_attempt() && limiter.acquire() {
//!     // call the source, then record the outcome
//!     breaker.record_success();
//! }
//! assert_eq!(backoff.delay(2), Duration::from_secs(4));
//! # }
//! ```

pub mod backoff;
pub mod circuit_breaker;
pub mod error;
pub mod rate_limiter;

// Re-export main types for convenience
pub use backoff::Backoff;
pub use circuit_breaker::{BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use error::ResilienceError;
pub use rate_limiter::{RateLimitConfig, RateLimitSnapshot, RateLimiter};

/// Prelude module for convenient imports
///
/// # Example
/// ```
/// use sluice_core_resilience::prelude::*;
/// ```
pub mod prelude {
    pub use super::backoff::Backoff;
    pub use super::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
    pub use super::error::ResilienceError;
    pub use super::rate_limiter::{RateLimitConfig, RateLimiter};
}
