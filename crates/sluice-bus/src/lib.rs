//! Sluice Bus: Message bus and stream processor collaborators
//!
//! Connectors publish normalized records here; the ingestion manager
//! publishes periodic health snapshots and reads bus connectivity when
//! computing overall health.
//!
//! # Architecture
//!
//! - **MessageBus**: `connect` / `disconnect` / `publish` / `stats` contract
//! - **BusBackend**: The bus strategy chosen at construction, either
//!   `KafkaRest` (Kafka through its REST proxy) or `InMemory`
//! - **StreamProcessor**: Downstream consumer started and stopped alongside
//!   the bus (`TopicTap` for the in-memory bus, `IdleProcessor` otherwise)
//!
//! # Example
//!
//! ```rust
//! use sluice_bus::{BusBackend, MessageBus, Priority};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), sluice_bus::BusError> {
//! let bus = BusBackend::in_memory(100);
//! bus.connect().await?;
//!
//! let message = bus
//!     .publish("news.articles", json!({"id": 1}), Some("1"), Some(Priority::High))
//!     .await?;
//! assert_eq!(message.topic, "news.articles");
//! assert!(bus.stats().connected);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod error;
pub mod kafka_rest;
pub mod memory;
pub mod message;
pub mod processor;

pub use backend::{BusBackend, BusMode};
pub use error::BusError;
pub use kafka_rest::{KafkaRestBus, KafkaRestConfig};
pub use memory::InMemoryBus;
pub use message::{topics, BusKind, BusMessage, BusStats, MessageBus, Priority};
pub use processor::{IdleProcessor, ProcessorStats, StreamProcessor, TopicTap};
