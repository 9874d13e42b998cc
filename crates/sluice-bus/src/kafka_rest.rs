//! Kafka-backed bus via a Kafka REST proxy
//!
//! Publishes records with the v2 JSON embedded format:
//!
//! ```text
//! POST {base_url}/topics/{topic}
//! Content-Type: application/vnd.kafka.json.v2+json
//! {"records":[{"key":"...","value":{...envelope...}}]}
//! ```

use crate::error::BusError;
use crate::message::{validate_topic, BusKind, BusMessage, BusStats, MessageBus, Priority};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

const KAFKA_JSON_V2: &str = "application/vnd.kafka.json.v2+json";

/// Connection settings for the REST proxy
#[derive(Debug, Clone, PartialEq)]
pub struct KafkaRestConfig {
    /// Base URL of the proxy, e.g. `http://localhost:8082`
    pub base_url: String,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl Default for KafkaRestConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8082".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Default)]
struct RestState {
    connected: bool,
    messages_published: u64,
    publish_failures: u64,
    topics: HashSet<String>,
}

#[derive(Serialize)]
struct ProduceRequest<'a> {
    records: [ProduceRecord<'a>; 1],
}

#[derive(Serialize)]
struct ProduceRecord<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<&'a str>,
    value: &'a BusMessage,
}

/// Message bus publishing to Kafka through its REST proxy
#[derive(Debug)]
pub struct KafkaRestBus {
    config: KafkaRestConfig,
    client: reqwest::Client,
    state: Mutex<RestState>,
}

impl KafkaRestBus {
    pub fn new(config: KafkaRestConfig) -> Result<Self, BusError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            config,
            client,
            state: Mutex::new(RestState::default()),
        })
    }

    pub fn config(&self) -> &KafkaRestConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn lock(&self) -> MutexGuard<'_, RestState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_failure(&self) {
        self.lock().publish_failures += 1;
    }
}

#[async_trait]
impl MessageBus for KafkaRestBus {
    async fn connect(&self) -> Result<(), BusError> {
        let url = self.endpoint("topics");
        debug!("Probing Kafka REST proxy at {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| BusError::ConnectionFailed {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(BusError::ConnectionFailed {
                url,
                reason: format!("HTTP {}", response.status().as_u16()),
            });
        }

        self.lock().connected = true;
        info!("Connected to Kafka REST proxy at {}", self.config.base_url);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BusError> {
        self.lock().connected = false;
        info!("Disconnected from Kafka REST proxy");
        Ok(())
    }

    async fn publish(
        &self,
        topic: &str,
        payload: serde_json::Value,
        key: Option<&str>,
        priority: Option<Priority>,
    ) -> Result<BusMessage, BusError> {
        if !self.lock().connected {
            self.record_failure();
            return Err(BusError::NotConnected);
        }
        if let Err(e) = validate_topic(topic) {
            self.record_failure();
            return Err(e);
        }

        let message = BusMessage::new(topic, payload, key, priority);
        let body = ProduceRequest {
            records: [ProduceRecord {
                key,
                value: &message,
            }],
        };

        let response = self
            .client
            .post(self.endpoint(&format!("topics/{}", topic)))
            .header(reqwest::header::CONTENT_TYPE, KAFKA_JSON_V2)
            .body(serde_json::to_vec(&body)?)
            .send()
            .await
            .inspect_err(|_| self.record_failure())?;

        let status = response.status();
        if !status.is_success() {
            self.record_failure();
            warn!(topic, status = status.as_u16(), "Kafka REST proxy rejected record");
            return Err(BusError::Rejected {
                topic: topic.to_string(),
                status: status.as_u16(),
            });
        }

        let mut state = self.lock();
        state.messages_published += 1;
        state.topics.insert(topic.to_string());
        drop(state);

        debug!(topic, id = %message.id, "Published message to Kafka");
        Ok(message)
    }

    fn stats(&self) -> BusStats {
        let state = self.lock();
        BusStats {
            backend: BusKind::KafkaRest,
            connected: state.connected,
            messages_published: state.messages_published,
            publish_failures: state.publish_failures,
            topics: state.topics.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_joins_paths() {
        let bus = KafkaRestBus::new(KafkaRestConfig {
            base_url: "http://proxy:8082/".to_string(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(bus.endpoint("topics/news"), "http://proxy:8082/topics/news");
    }

    #[test]
    fn test_produce_request_shape() {
        let message = BusMessage::new("news", json!({"id": 7}), Some("7"), None);
        let body = ProduceRequest {
            records: [ProduceRecord {
                key: Some("7"),
                value: &message,
            }],
        };

        let encoded = serde_json::to_value(&body).unwrap();
        assert_eq!(encoded["records"][0]["key"], "7");
        assert_eq!(encoded["records"][0]["value"]["payload"]["id"], 7);
        assert_eq!(encoded["records"][0]["value"]["priority"], "normal");
    }

    #[tokio::test]
    async fn test_publish_before_connect_fails_fast() {
        let bus = KafkaRestBus::new(KafkaRestConfig::default()).unwrap();

        let result = bus.publish("news", json!({}), None, None).await;

        assert!(matches!(result, Err(BusError::NotConnected)));
        let stats = bus.stats();
        assert_eq!(stats.publish_failures, 1);
        assert_eq!(stats.backend, BusKind::KafkaRest);
        assert!(!stats.connected);
    }
}
