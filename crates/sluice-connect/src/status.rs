//! Connector status and counters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sluice_core_resilience::{BreakerSnapshot, RateLimitSnapshot};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectorStatus {
    /// Last cycle succeeded
    Healthy,
    /// Last cycle failed, circuit still closed
    Degraded,
    /// Circuit is open
    Unhealthy,
    /// Disabled in configuration
    Disabled,
}

impl ConnectorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectorStatus::Healthy => "HEALTHY",
            ConnectorStatus::Degraded => "DEGRADED",
            ConnectorStatus::Unhealthy => "UNHEALTHY",
            ConnectorStatus::Disabled => "DISABLED",
        }
    }
}

impl fmt::Display for ConnectorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-connector counters
///
/// `requests_total` counts fetch attempts including retries;
/// `requests_successful` and `requests_failed` count poll cycles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectorStats {
    pub requests_total: u64,
    pub requests_successful: u64,
    pub requests_failed: u64,
    pub records_ingested: u64,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<DateTime<Utc>>,
    pub last_error_message: Option<String>,
}

/// Read-only view returned by `Connector::snapshot`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorSnapshot {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub status: ConnectorStatus,
    pub running: bool,
    pub circuit_breaker: BreakerSnapshot,
    pub rate_limiter: RateLimitSnapshot,
    pub stats: ConnectorStats,
}
