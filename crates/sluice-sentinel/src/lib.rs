//! Sluice Sentinel: The ingestion manager
//!
//! Keeps a named set of connectors running, watches their health and
//! restarts the ones whose circuit has opened.
//!
//! # Architecture: The Health Loop
//!
//! ```text
//! ┌─────────────┐
//! │  Observe    │──> Read every connector's status
//! └──────┬──────┘
//!        │
//!        v
//! ┌─────────────┐
//! │  Aggregate  │──> Healthy? Degraded? Unhealthy? Bus up?
//! └──────┬──────┘
//!        │
//!        v
//! ┌─────────────┐
//! │  Act        │──> Restart UNHEALTHY connectors
//! └──────┬──────┘
//!        │
//!        v
//! ┌─────────────┐
//! │  Report     │──> Publish snapshot to `system.health`
//! └──────┬──────┘
//!        │
//!        └────> Sleep, loop
//! ```

pub mod error;
pub mod health;
pub mod manager;
pub mod policy;

pub use error::SentinelError;
pub use health::{HealthSnapshot, ManagerStats, OverallStatus};
pub use manager::IngestionManager;
pub use policy::ManagerPolicy;
