//! HTTP JSON source
//!
//! GETs a URL, pulls the record array out of the response body and publishes
//! each record to the bus under a configured topic.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sluice_bus::{MessageBus, Priority};
use sluice_connect::{ConnectorConfig, ConnectorError, DataSource, FetchFailure, FetchOutcome};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpJsonConfig {
    pub url: String,

    /// Topic every record is published to
    pub topic: String,

    /// Extra request headers, e.g. API keys
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    /// JSON pointer to the record array, e.g. `/data/items`; the whole body
    /// when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records_pointer: Option<String>,

    /// Record field used as the message key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_field: Option<String>,

    #[serde(default)]
    pub priority: Priority,
}

impl HttpJsonConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(format!("url must be http(s), got '{}'", self.url));
        }
        if self.topic.trim().is_empty() {
            return Err("topic must not be empty".to_string());
        }
        if let Some(pointer) = &self.records_pointer {
            if !pointer.is_empty() && !pointer.starts_with('/') {
                return Err(format!("records_pointer must start with '/', got '{}'", pointer));
            }
        }
        Ok(())
    }
}

/// Polls one URL and publishes each record as its own bus message
///
/// Delivery is at least once. Records are published one by one, so when
/// record `k` fails to publish, records `0..k` are already on the bus while
/// the cycle counts as failed, and the next successful fetch publishes them
/// again. Consumers should deduplicate on the message key.
pub struct HttpJsonSource {
    config: HttpJsonConfig,
    bus: Arc<dyn MessageBus>,
    client: Option<reqwest::Client>,
}

impl HttpJsonSource {
    pub fn new(config: HttpJsonConfig, bus: Arc<dyn MessageBus>) -> Self {
        Self {
            config,
            bus,
            client: None,
        }
    }

    pub fn config(&self) -> &HttpJsonConfig {
        &self.config
    }

    fn build_client(&self, connector: &ConnectorConfig) -> Result<reqwest::Client, ConnectorError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.config.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ConnectorError::Open(format!("invalid header name '{}': {}", name, e)))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| ConnectorError::Open(format!("invalid value for header '{}': {}", name, e)))?;
            headers.insert(header_name, header_value);
        }

        reqwest::Client::builder()
            .connect_timeout(connector.connection_timeout())
            .read_timeout(connector.read_timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| ConnectorError::Open(e.to_string()))
    }
}

/// Records at `pointer` (or the whole body): arrays are split, null is no
/// records, anything else is a single record
pub fn extract_records(body: Value, pointer: Option<&str>) -> Result<Vec<Value>, FetchFailure> {
    let target = match pointer.filter(|p| !p.is_empty()) {
        Some(pointer) => match body.pointer(pointer) {
            Some(value) => value.clone(),
            None => {
                return Err(FetchFailure::Other(format!(
                    "no value at JSON pointer '{}'",
                    pointer
                )))
            }
        },
        None => body,
    };

    Ok(match target {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    })
}

/// Message key taken from a string or number field of the record
pub fn record_key(record: &Value, field: &str) -> Option<String> {
    match record.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn classify_transport_error(err: reqwest::Error) -> FetchOutcome<Vec<Value>> {
    if err.is_timeout() {
        FetchOutcome::timeout(err.to_string())
    } else {
        FetchOutcome::Retryable(FetchFailure::Other(err.to_string()))
    }
}

#[async_trait]
impl DataSource for HttpJsonSource {
    type Item = Vec<Value>;

    async fn open(&mut self, config: &ConnectorConfig) -> Result<(), ConnectorError> {
        self.client = Some(self.build_client(config)?);
        debug!(url = %self.config.url, "HTTP client ready");
        Ok(())
    }

    async fn fetch(&mut self) -> FetchOutcome<Vec<Value>> {
        let Some(client) = &self.client else {
            return FetchOutcome::Permanent(FetchFailure::Other(
                "source used before open".to_string(),
            ));
        };

        let response = match client.get(&self.config.url).send().await {
            Ok(response) => response,
            Err(e) => return classify_transport_error(e),
        };

        let status = response.status();
        if !status.is_success() {
            return FetchOutcome::from_status(
                status.as_u16(),
                status.canonical_reason().unwrap_or("request failed"),
            );
        }

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => return FetchOutcome::timeout(e.to_string()),
            Err(e) => {
                return FetchOutcome::Retryable(FetchFailure::Other(format!(
                    "invalid JSON body: {}",
                    e
                )))
            }
        };

        match extract_records(body, self.config.records_pointer.as_deref()) {
            Ok(records) => FetchOutcome::Success(records),
            Err(failure) => FetchOutcome::Permanent(failure),
        }
    }

    async fn ingest(&mut self, data: Vec<Value>) -> Result<(), ConnectorError> {
        for record in data {
            let key = self
                .config
                .key_field
                .as_deref()
                .and_then(|field| record_key(&record, field));

            self.bus
                .publish(
                    &self.config.topic,
                    record,
                    key.as_deref(),
                    Some(self.config.priority),
                )
                .await
                .map_err(|e| ConnectorError::Ingest(e.to_string()))?;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ConnectorError> {
        self.client = None;
        Ok(())
    }
}
