//! Bus backend selection
//!
//! The backend is picked once, when the bus is built. There is no silent
//! fallback from Kafka to memory at runtime: a Kafka bus that cannot reach
//! its proxy reports itself disconnected, and health checks see that.

use crate::error::BusError;
use crate::kafka_rest::{KafkaRestBus, KafkaRestConfig};
use crate::memory::InMemoryBus;
use crate::message::{BusMessage, BusStats, MessageBus, Priority};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Configured bus flavour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BusMode {
    /// Process-local bus, for development and tests
    #[default]
    Memory,
    /// Kafka through its REST proxy
    KafkaRest,
}

/// The two bus strategies behind one `MessageBus` implementation
#[derive(Debug)]
pub enum BusBackend {
    KafkaRest(KafkaRestBus),
    InMemory(InMemoryBus),
}

impl BusBackend {
    pub fn in_memory(history_limit: usize) -> Self {
        BusBackend::InMemory(InMemoryBus::new(history_limit))
    }

    pub fn kafka_rest(config: KafkaRestConfig) -> Result<Self, BusError> {
        Ok(BusBackend::KafkaRest(KafkaRestBus::new(config)?))
    }

    pub fn mode(&self) -> BusMode {
        match self {
            BusBackend::KafkaRest(_) => BusMode::KafkaRest,
            BusBackend::InMemory(_) => BusMode::Memory,
        }
    }

    /// The in-memory bus, if that is the active strategy
    pub fn as_in_memory(&self) -> Option<&InMemoryBus> {
        match self {
            BusBackend::InMemory(bus) => Some(bus),
            BusBackend::KafkaRest(_) => None,
        }
    }

    fn inner(&self) -> &dyn MessageBus {
        match self {
            BusBackend::KafkaRest(bus) => bus,
            BusBackend::InMemory(bus) => bus,
        }
    }
}

#[async_trait]
impl MessageBus for BusBackend {
    async fn connect(&self) -> Result<(), BusError> {
        self.inner().connect().await
    }

    async fn disconnect(&self) -> Result<(), BusError> {
        self.inner().disconnect().await
    }

    async fn publish(
        &self,
        topic: &str,
        payload: serde_json::Value,
        key: Option<&str>,
        priority: Option<Priority>,
    ) -> Result<BusMessage, BusError> {
        self.inner().publish(topic, payload, key, priority).await
    }

    fn stats(&self) -> BusStats {
        self.inner().stats()
    }
}
