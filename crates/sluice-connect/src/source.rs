//! Data source contract
//!
//! A `DataSource` is the per-source half of a connector: it knows how to
//! fetch one batch from an external system and how to forward that batch
//! downstream. The `Connector` owns scheduling, rate limiting, retries and
//! circuit breaking around it.

use crate::config::ConnectorConfig;
use crate::error::ConnectorError;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// Why a single fetch attempt failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    Timeout(String),
    Status { code: u16, message: String },
    Other(String),
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchFailure::Timeout(detail) => write!(f, "timeout: {}", detail),
            FetchFailure::Status { code, message } => write!(f, "HTTP {}: {}", code, message),
            FetchFailure::Other(detail) => write!(f, "{}", detail),
        }
    }
}

/// Result of a single fetch attempt, classified for the retry policy
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    Success(T),
    /// Timeouts, 5xx and anything unclassified; retried with backoff
    Retryable(FetchFailure),
    /// 4xx other than 429; never retried
    Permanent(FetchFailure),
    /// 429 from the remote source; retried after a fixed cooldown
    RateLimited,
}

impl<T> FetchOutcome<T> {
    /// Classify a non-success HTTP-like status code
    ///
    /// 429 is `RateLimited`, 5xx (and anything outside 4xx) is `Retryable`,
    /// other 4xx codes are `Permanent`.
    pub fn from_status(code: u16, message: impl Into<String>) -> Self {
        let failure = FetchFailure::Status {
            code,
            message: message.into(),
        };
        match code {
            429 => FetchOutcome::RateLimited,
            400..=499 => FetchOutcome::Permanent(failure),
            _ => FetchOutcome::Retryable(failure),
        }
    }

    pub fn timeout(detail: impl Into<String>) -> Self {
        FetchOutcome::Retryable(FetchFailure::Timeout(detail.into()))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }
}

/// Something a fetch can return, counted in records
pub trait Payload {
    fn record_count(&self) -> u64;

    /// Empty payloads are not ingested
    fn is_empty_payload(&self) -> bool {
        self.record_count() == 0
    }
}

impl<T> Payload for Vec<T> {
    fn record_count(&self) -> u64 {
        self.len() as u64
    }
}

impl<T: Payload> Payload for Option<T> {
    fn record_count(&self) -> u64 {
        self.as_ref().map_or(0, Payload::record_count)
    }
}

impl Payload for Value {
    fn record_count(&self) -> u64 {
        match self {
            Value::Null => 0,
            Value::Array(items) => items.len() as u64,
            _ => 1,
        }
    }
}

#[async_trait]
pub trait DataSource: Send + 'static {
    type Item: Payload + Send;

    /// Allocate I/O resources before the first poll cycle
    async fn open(&mut self, _config: &ConnectorConfig) -> Result<(), ConnectorError> {
        Ok(())
    }

    /// One fetch attempt
    async fn fetch(&mut self) -> FetchOutcome<Self::Item>;

    /// Forward a non-empty batch downstream
    async fn ingest(&mut self, data: Self::Item) -> Result<(), ConnectorError>;

    /// Release I/O resources after the poll loop has stopped
    async fn close(&mut self) -> Result<(), ConnectorError> {
        Ok(())
    }
}
