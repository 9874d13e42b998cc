/*!
 * Integration tests for Sluice
 *
 * Each test serves canned HTTP responses from a local listener so the full
 * path (config file -> assembly -> connector -> HTTP -> bus) is exercised.
 */

mod common;

use common::{serve_chunked_body, serve_json, Route};
use sluice::bus::{BusBackend, BusMode, MessageBus, Priority};
use sluice::connect::{ConnectorConfig, ConnectorStatus, DataSource, FetchOutcome};
use sluice::sentinel::OverallStatus;
use sluice::{Application, HttpJsonConfig, HttpJsonSource, SluiceConfig, SluiceError};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

fn config_toml(url: &str) -> String {
    format!(
        r#"
        [logging]
        level = "debug"

        [bus]
        mode = "memory"
        history_limit = 50

        [[connectors]]
        name = "posts"
        poll_interval_seconds = 300
        max_retries = 2
        retry_delay_seconds = 0.05

        [connectors.source]
        kind = "http-json"
        url = "{url}"
        topic = "test.posts"
        records_pointer = "/items"
        key_field = "id"
        "#
    )
}

async fn wait_for<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

#[tokio::test]
async fn test_config_file_to_published_records() {
    let server = serve_json(vec![Route::ok(
        r#"{"items": [{"id": 1, "title": "a"}, {"id": 2, "title": "b"}]}"#,
    )])
    .await;

    let dir = tempdir().unwrap();
    let path = dir.path().join("sluice.toml");
    std::fs::write(&path, config_toml(&server.url("/posts"))).unwrap();

    let config = SluiceConfig::from_file(&path).unwrap();
    let app = Application::assemble(&config).await.unwrap();
    assert_eq!(app.bus().mode(), BusMode::Memory);

    app.start().await.unwrap();
    assert!(app.bus_connected());

    let bus = app.bus().clone();
    assert!(wait_for(|| bus.as_in_memory().unwrap().messages("test.posts").len() == 2).await);

    let messages = bus.as_in_memory().unwrap().messages("test.posts");
    assert_eq!(messages[0].key.as_deref(), Some("1"));
    assert_eq!(messages[1].payload["title"], "b");

    let stats = app.manager().get_connector_stats("posts").await.unwrap();
    assert_eq!(stats.stats.records_ingested, 2);
    assert_eq!(stats.status, ConnectorStatus::Healthy);

    let health = app.health().await;
    assert_eq!(health.status, OverallStatus::Healthy);
    assert!(health.processor_running);

    app.stop().await;
    assert!(!app.bus_connected());
    assert!(!app.stats().await.running);
}

#[tokio::test]
async fn test_server_errors_are_retried_within_cycle() {
    let server = serve_json(vec![
        Route::status(503, r#"{"error": "busy"}"#),
        Route::ok(r#"{"items": [{"id": 9}]}"#),
    ])
    .await;

    let config = SluiceConfig::from_toml(&config_toml(&server.url("/posts"))).unwrap();
    let app = Application::assemble(&config).await.unwrap();
    app.start().await.unwrap();

    let manager = app.manager().clone();
    let mut ingested = 0;
    for _ in 0..200 {
        ingested = manager
            .get_connector_stats("posts")
            .await
            .map_or(0, |s| s.stats.records_ingested);
        if ingested == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(ingested, 1);

    let stats = manager.get_connector_stats("posts").await.unwrap().stats;
    assert_eq!(stats.requests_total, 2);
    assert_eq!(stats.requests_failed, 0);
    assert_eq!(server.hits(), 2);

    app.stop().await;
}

#[tokio::test]
async fn test_client_error_fails_cycle_without_retry() {
    let server = serve_json(vec![Route::status(404, r#"{"error": "gone"}"#)]).await;

    let config = SluiceConfig::from_toml(&config_toml(&server.url("/posts"))).unwrap();
    let app = Application::assemble(&config).await.unwrap();
    app.start().await.unwrap();

    let manager = app.manager().clone();
    let mut failed = 0;
    for _ in 0..200 {
        failed = manager
            .get_connector_stats("posts")
            .await
            .map_or(0, |s| s.stats.requests_failed);
        if failed == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(failed, 1);

    let stats = manager.get_connector_stats("posts").await.unwrap();
    assert_eq!(stats.stats.requests_total, 1);
    assert_eq!(stats.status, ConnectorStatus::Degraded);
    assert_eq!(server.hits(), 1);
    assert_eq!(app.health().await.status, OverallStatus::Degraded);

    app.stop().await;
}

#[tokio::test]
async fn test_duplicate_connectors_fail_assembly() {
    let mut config = SluiceConfig::sample();
    config.connectors.push(config.connectors[0].clone());

    let err = Application::assemble(&config).await.err().unwrap();
    assert!(matches!(err, SluiceError::Config(_)));
    assert_eq!(err.exit_code(), sluice::error::EXIT_CONFIG);
}

#[tokio::test]
async fn test_unreachable_kafka_proxy_fails_start() {
    let mut config = SluiceConfig::sample();
    config.bus.mode = BusMode::KafkaRest;
    config.bus.url = "http://127.0.0.1:9".to_string();
    config.bus.request_timeout_secs = 1;

    let app = Application::assemble(&config).await.unwrap();
    assert_eq!(app.bus().mode(), BusMode::KafkaRest);

    let err = app.start().await.unwrap_err();
    assert!(matches!(err, SluiceError::Manager(_)));
    assert!(!app.manager().is_running());
    assert!(!app.bus().stats().connected);
}

async fn open_source(url: String, read_timeout_seconds: f64) -> HttpJsonSource {
    let bus = Arc::new(BusBackend::in_memory(10));
    let mut source = HttpJsonSource::new(
        HttpJsonConfig {
            url,
            topic: "test.slow".to_string(),
            headers: BTreeMap::new(),
            records_pointer: Some("/items".to_string()),
            key_field: None,
            priority: Priority::Normal,
        },
        bus,
    );

    let mut connector = ConnectorConfig::new("slow");
    connector.read_timeout_seconds = read_timeout_seconds;
    source.open(&connector).await.unwrap();
    source
}

#[tokio::test]
async fn test_slow_steady_body_is_not_a_timeout() {
    // 1.2s in total, but no single read waits longer than 0.4s
    let server = serve_chunked_body(
        vec![r#"{"items": "#, r#"[{"id": 1}, "#, r#"{"id": 2}"#, "]}"],
        Duration::from_millis(400),
    )
    .await;
    let mut source = open_source(server.url("/"), 1.0).await;

    match source.fetch().await {
        FetchOutcome::Success(records) => assert_eq!(records.len(), 2),
        other => panic!("expected records, got {:?}", other),
    }
}

#[tokio::test]
async fn test_stalled_body_is_retryable() {
    let server = serve_chunked_body(
        vec![r#"{"items": "#, r#"[{"id": 1}]}"#],
        Duration::from_secs(3),
    )
    .await;
    let mut source = open_source(server.url("/"), 0.5).await;

    assert!(matches!(source.fetch().await, FetchOutcome::Retryable(_)));
}
