//! Sluice Connect: Scheduled, fault-tolerant polling of external sources
//!
//! Each connector polls one source on its own schedule, protected by a
//! private rate limiter and circuit breaker, and forwards what it fetched
//! downstream.
//!
//! # Architecture
//!
//! - **DataSource**: Per-source `fetch` / `ingest` pair, with optional
//!   `open` / `close` hooks for I/O clients
//! - **FetchOutcome**: Classified result of one fetch attempt, driving the
//!   retry policy (`Success`, `Retryable`, `Permanent`, `RateLimited`)
//! - **Connector**: Owns the poll loop, retries and counters for one source
//! - **ManagedConnector**: Object-safe lifecycle trait used by the manager
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use sluice_connect::{Connector, ConnectorConfig, ConnectorError, DataSource, FetchOutcome};
//!
//! struct Counter(u32);
//!
//! #[async_trait]
//! impl DataSource for Counter {
//!     type Item = Vec<u32>;
//!
//!     async fn fetch(&mut self) -> FetchOutcome<Vec<u32>> {
//!         self.0 += 1;
//!         FetchOutcome::Success(vec![self.0])
//!     }
//!
//!     async fn ingest(&mut self, _data: Vec<u32>) -> Result<(), ConnectorError> {
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ConnectorError> {
//! let connector = Connector::new(ConnectorConfig::new("counter"), Counter(0))?;
//! connector.start().await?;
//! assert!(connector.is_running());
//! connector.stop().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connector;
pub mod error;
pub mod source;
pub mod status;

pub use config::ConnectorConfig;
pub use connector::{Connector, ManagedConnector};
pub use error::ConnectorError;
pub use source::{DataSource, FetchFailure, FetchOutcome, Payload};
pub use status::{ConnectorSnapshot, ConnectorStats, ConnectorStatus};
