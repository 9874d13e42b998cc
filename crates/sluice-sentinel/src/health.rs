//! Health aggregation
//!
//! Counts connectors by status and folds in bus and processor state to give
//! one overall verdict. Snapshots are recomputed on every request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sluice_bus::{BusStats, ProcessorStats};
use sluice_connect::{ConnectorSnapshot, ConnectorStatus};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OverallStatus::Healthy => "HEALTHY",
            OverallStatus::Degraded => "DEGRADED",
            OverallStatus::Unhealthy => "UNHEALTHY",
        };
        f.write_str(label)
    }
}

/// Point-in-time health of the whole ingestion pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub status: OverallStatus,

    pub total: usize,
    pub healthy: usize,
    pub degraded: usize,
    pub unhealthy: usize,
    pub disabled: usize,

    pub bus_connected: bool,
    pub processor_running: bool,

    /// Status per connector name
    pub connectors: BTreeMap<String, ConnectorStatus>,

    pub checked_at: DateTime<Utc>,
}

impl HealthSnapshot {
    /// Aggregate connector statuses
    ///
    /// UNHEALTHY if any connector is unhealthy or the bus is disconnected,
    /// else DEGRADED if any connector is degraded, else HEALTHY.
    pub fn compute<I>(connectors: I, bus_connected: bool, processor_running: bool) -> Self
    where
        I: IntoIterator<Item = (String, ConnectorStatus)>,
    {
        let connectors: BTreeMap<_, _> = connectors.into_iter().collect();
        let count = |wanted: ConnectorStatus| connectors.values().filter(|s| **s == wanted).count();

        let healthy = count(ConnectorStatus::Healthy);
        let degraded = count(ConnectorStatus::Degraded);
        let unhealthy = count(ConnectorStatus::Unhealthy);
        let disabled = count(ConnectorStatus::Disabled);

        let status = if unhealthy > 0 || !bus_connected {
            OverallStatus::Unhealthy
        } else if degraded > 0 {
            OverallStatus::Degraded
        } else {
            OverallStatus::Healthy
        };

        Self {
            status,
            total: connectors.len(),
            healthy,
            degraded,
            unhealthy,
            disabled,
            bus_connected,
            processor_running,
            connectors,
            checked_at: Utc::now(),
        }
    }

    /// Names of connectors currently UNHEALTHY
    pub fn unhealthy_connectors(&self) -> impl Iterator<Item = &str> {
        self.connectors
            .iter()
            .filter(|(_, status)| **status == ConnectorStatus::Unhealthy)
            .map(|(name, _)| name.as_str())
    }

    /// Share of connectors that are HEALTHY (1.0 when none are registered)
    pub fn health_ratio(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.healthy as f64 / self.total as f64
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Health: {} | {} connectors | {} healthy ({:.1}%) | {} degraded | {} unhealthy | {} disabled | bus {}",
            self.status,
            self.total,
            self.healthy,
            self.health_ratio() * 100.0,
            self.degraded,
            self.unhealthy,
            self.disabled,
            if self.bus_connected { "up" } else { "down" }
        )
    }
}

/// Everything the manager knows, for reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerStats {
    pub running: bool,
    pub connectors: BTreeMap<String, ConnectorSnapshot>,
    pub bus: BusStats,
    pub processor: ProcessorStats,
}
