/*!
 * Sluice - data-ingestion connector framework
 *
 * Connectors poll external sources on a schedule, each protected by its own
 * rate limiter and circuit breaker, and publish what they fetch to a message
 * bus. An ingestion manager keeps them running and reports their health.
 *
 * The building blocks live in the workspace crates and are re-exported here:
 *
 * - [`resilience`]: rate limiter, circuit breaker, backoff
 * - [`bus`]: message bus and stream processor
 * - [`connect`]: connector runtime and the `DataSource` contract
 * - [`sentinel`]: ingestion manager and health loop
 */

pub mod assembly;
pub mod config;
pub mod error;
pub mod logging;
pub mod sources;

pub use sluice_bus as bus;
pub use sluice_connect as connect;
pub use sluice_core_resilience as resilience;
pub use sluice_sentinel as sentinel;

pub use assembly::Application;
pub use config::{BusConfig, ConnectorEntry, LogLevel, LoggingConfig, SluiceConfig};
pub use error::{Result, SluiceError};
pub use sources::{HttpJsonConfig, HttpJsonSource, SourceConfig};
