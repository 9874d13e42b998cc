//! Message envelope, priorities, and the `MessageBus` contract

use crate::error::BusError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Well-known topic names
pub mod topics {
    /// Periodic health snapshots published by the ingestion manager
    pub const SYSTEM_HEALTH: &str = "system.health";
}

/// Delivery priority attached to a published message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

/// A message as accepted by the bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    /// Unique message identifier assigned at publish time
    pub id: Uuid,
    pub topic: String,
    pub key: Option<String>,
    pub priority: Priority,
    pub payload: serde_json::Value,
    pub published_at: DateTime<Utc>,
}

impl BusMessage {
    pub fn new(
        topic: &str,
        payload: serde_json::Value,
        key: Option<&str>,
        priority: Option<Priority>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic: topic.to_string(),
            key: key.map(str::to_string),
            priority: priority.unwrap_or_default(),
            payload,
            published_at: Utc::now(),
        }
    }
}

/// Which backend a bus instance runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BusKind {
    InMemory,
    KafkaRest,
}

/// Counters reported by every bus backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusStats {
    pub backend: BusKind,
    pub connected: bool,
    pub messages_published: u64,
    pub publish_failures: u64,
    /// Number of distinct topics published to
    pub topics: usize,
}

/// Publish/subscribe sink consumed by connectors and the ingestion manager
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Establish connectivity with the broker
    async fn connect(&self) -> Result<(), BusError>;

    /// Drop connectivity; later publishes fail with `NotConnected`
    async fn disconnect(&self) -> Result<(), BusError>;

    /// Publish a payload to a topic
    async fn publish(
        &self,
        topic: &str,
        payload: serde_json::Value,
        key: Option<&str>,
        priority: Option<Priority>,
    ) -> Result<BusMessage, BusError>;

    /// Synchronous view of connectivity and counters
    fn stats(&self) -> BusStats;
}

pub(crate) fn validate_topic(topic: &str) -> Result<(), BusError> {
    let valid = !topic.is_empty()
        && topic.len() <= 249
        && topic
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

    if valid {
        Ok(())
    } else {
        Err(BusError::InvalidTopic(topic.to_string()))
    }
}
