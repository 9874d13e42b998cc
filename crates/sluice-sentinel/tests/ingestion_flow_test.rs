//! Ingestion flow: real connectors driven by the manager over the in-memory bus
//!
//! Scenario:
//! 1. A source yields `[{"id": 1}]` once, then empty batches
//! 2. The connector polls with no interval but one request per minute
//! 3. After `start_all` and a scheduler tick, exactly one record is ingested
//!    and published to the source topic

use async_trait::async_trait;
use serde_json::{json, Value};
use sluice_bus::{BusBackend, MessageBus, TopicTap};
use sluice_connect::{
    Connector, ConnectorConfig, ConnectorError, ConnectorStatus, DataSource, FetchOutcome,
};
use sluice_sentinel::{IngestionManager, ManagerPolicy, OverallStatus};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

const TOPIC: &str = "test.records";

/// Returns one record on the first fetch, nothing afterwards
struct OneShotSource {
    bus: Arc<BusBackend>,
    fetches: Arc<AtomicU32>,
}

#[async_trait]
impl DataSource for OneShotSource {
    type Item = Vec<Value>;

    async fn fetch(&mut self) -> FetchOutcome<Vec<Value>> {
        let previous = self.fetches.fetch_add(1, Ordering::SeqCst);
        if previous == 0 {
            FetchOutcome::Success(vec![json!({"id": 1})])
        } else {
            FetchOutcome::Success(Vec::new())
        }
    }

    async fn ingest(&mut self, data: Vec<Value>) -> Result<(), ConnectorError> {
        for record in data {
            self.bus
                .publish(TOPIC, record, None, None)
                .await
                .map_err(|e| ConnectorError::Ingest(e.to_string()))?;
        }
        Ok(())
    }
}

/// Always fails with a server error
struct BrokenSource;

#[async_trait]
impl DataSource for BrokenSource {
    type Item = Vec<Value>;

    async fn fetch(&mut self) -> FetchOutcome<Vec<Value>> {
        FetchOutcome::from_status(503, "maintenance")
    }

    async fn ingest(&mut self, _data: Vec<Value>) -> Result<(), ConnectorError> {
        Ok(())
    }
}

fn test_config(name: &str) -> ConnectorConfig {
    let mut config = ConnectorConfig::new(name);
    config.poll_interval_seconds = 0.0;
    config.max_requests_per_minute = 1;
    config
}

#[tokio::test(start_paused = true)]
async fn test_end_to_end_single_record() {
    let bus = Arc::new(BusBackend::in_memory(100));
    let tap = Arc::new(TopicTap::new(bus.clone()));
    let manager =
        IngestionManager::new(bus.clone(), tap.clone(), ManagerPolicy::default()).unwrap();

    let fetches = Arc::new(AtomicU32::new(0));
    let source = OneShotSource {
        bus: bus.clone(),
        fetches: fetches.clone(),
    };
    let connector = Connector::new(test_config("news"), source).unwrap();
    manager.register_connector("news", Arc::new(connector)).await;

    manager.start_all().await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let stats = manager.get_connector_stats("news").await.unwrap();
    assert_eq!(stats.stats.records_ingested, 1);
    assert_eq!(stats.stats.requests_successful, 1);
    assert_eq!(stats.status, ConnectorStatus::Healthy);
    assert!(stats.running);

    // The second cycle is waiting on the rate limiter
    assert_eq!(fetches.load(Ordering::SeqCst), 1);

    let published = bus.as_in_memory().unwrap().messages(TOPIC);
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].payload, json!({"id": 1}));
    assert_eq!(tap.topic_count(TOPIC), 1);

    let health = manager.get_health().await;
    assert_eq!(health.status, OverallStatus::Healthy);
    assert!(health.processor_running);

    manager.stop_all().await;
    assert!(!manager.get_connector_stats("news").await.unwrap().running);
}

#[tokio::test(start_paused = true)]
async fn test_failing_connector_is_restarted_by_health_loop() {
    let bus = Arc::new(BusBackend::in_memory(100));
    let policy = ManagerPolicy {
        health_check_interval_s: 30,
        ..Default::default()
    };
    let manager =
        IngestionManager::new(bus.clone(), Arc::new(sluice_bus::IdleProcessor::new()), policy)
            .unwrap();

    let mut config = ConnectorConfig::new("broken");
    config.max_retries = 1;
    config.circuit_breaker_threshold = 1;
    config.poll_interval_seconds = 10.0;
    let broken = Arc::new(Connector::new(config, BrokenSource).unwrap());
    manager.register_connector("broken", broken.clone()).await;

    manager.start_all().await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(broken.status(), ConnectorStatus::Unhealthy);
    assert_eq!(manager.get_health().await.status, OverallStatus::Unhealthy);

    // Health check at 30s restarts it and publishes the snapshot
    tokio::time::sleep(Duration::from_secs(35)).await;
    let health_messages = bus.as_in_memory().unwrap().messages("system.health");
    assert_eq!(health_messages.len(), 1);
    assert_eq!(health_messages[0].payload["unhealthy"], 1);
    assert!(broken.is_running());

    // The breaker is not reset by a restart
    assert_eq!(broken.status(), ConnectorStatus::Unhealthy);
    assert_eq!(broken.snapshot().stats.requests_failed, 1);

    manager.stop_all().await;
    assert!(!broken.is_running());
}
