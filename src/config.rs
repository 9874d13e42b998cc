/*!
 * Configuration for the sluice binary
 *
 * A single TOML file describes logging, the message bus, the ingestion
 * manager policy and every connector:
 *
 * ```toml
 * [logging]
 * level = "info"
 *
 * [bus]
 * mode = "memory"
 *
 * [manager]
 * health_check_interval_s = 60
 *
 * [[connectors]]
 * name = "weather"
 * poll_interval_seconds = 300
 *
 * [connectors.source]
 * kind = "http-json"
 * url = "https://api.example.com/observations"
 * topic = "weather.observations"
 * ```
 */

use crate::error::{Result, SluiceError};
use crate::sources::{HttpJsonConfig, SourceConfig};
use serde::{Deserialize, Serialize};
use sluice_bus::{BusMode, KafkaRestConfig, Priority};
use sluice_connect::ConnectorConfig;
use sluice_sentinel::ManagerPolicy;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SluiceConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub bus: BusConfig,

    #[serde(default)]
    pub manager: ManagerPolicy,

    #[serde(default)]
    pub connectors: Vec<ConnectorEntry>,
}

/// Diagnostic output settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (overridden by RUST_LOG)
    #[serde(default)]
    pub level: LogLevel,

    /// Write JSON logs to this file instead of compact stdout output
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Force debug level
    #[serde(default)]
    pub verbose: bool,
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Message bus settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusConfig {
    #[serde(default)]
    pub mode: BusMode,

    /// Kafka REST proxy base URL (kafka-rest mode)
    #[serde(default = "default_bus_url")]
    pub url: String,

    /// Messages kept per topic (memory mode)
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Per-request timeout against the proxy (kafka-rest mode)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_bus_url() -> String {
    KafkaRestConfig::default().base_url
}

fn default_history_limit() -> usize {
    sluice_bus::memory::DEFAULT_HISTORY_LIMIT
}

fn default_request_timeout() -> u64 {
    10
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            mode: BusMode::default(),
            url: default_bus_url(),
            history_limit: default_history_limit(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl BusConfig {
    pub fn kafka_rest(&self) -> KafkaRestConfig {
        KafkaRestConfig {
            base_url: self.url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

/// One `[[connectors]]` entry: connector knobs plus its source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorEntry {
    #[serde(flatten)]
    pub connector: ConnectorConfig,

    pub source: SourceConfig,
}

impl SluiceConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SluiceError::ConfigNotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Check the whole configuration before anything is built from it
    pub fn validate(&self) -> Result<()> {
        self.manager.validate()?;

        if self.bus.history_limit == 0 {
            return Err(SluiceError::Config(
                "bus.history_limit must be at least 1".to_string(),
            ));
        }
        if self.bus.mode == BusMode::KafkaRest {
            if self.bus.url.trim().is_empty() {
                return Err(SluiceError::Config(
                    "bus.url is required in kafka-rest mode".to_string(),
                ));
            }
            if self.bus.request_timeout_secs == 0 {
                return Err(SluiceError::Config(
                    "bus.request_timeout_secs must be greater than 0".to_string(),
                ));
            }
        }

        let mut names = HashSet::new();
        for entry in &self.connectors {
            entry.connector.validate()?;
            if !names.insert(entry.connector.name.as_str()) {
                return Err(SluiceError::Config(format!(
                    "duplicate connector name '{}'",
                    entry.connector.name
                )));
            }
            entry
                .source
                .validate()
                .map_err(|reason| {
                    SluiceError::Config(format!("connector '{}': {}", entry.connector.name, reason))
                })?;
        }

        Ok(())
    }

    /// Example configuration printed by `sluice init`
    pub fn sample() -> Self {
        let mut connector = ConnectorConfig::new("example-posts");
        connector.poll_interval_seconds = 300.0;
        connector.max_requests_per_minute = 10;

        let mut headers = BTreeMap::new();
        headers.insert("Accept".to_string(), "application/json".to_string());

        Self {
            logging: LoggingConfig::default(),
            bus: BusConfig::default(),
            manager: ManagerPolicy::default(),
            connectors: vec![ConnectorEntry {
                connector,
                source: SourceConfig::HttpJson(HttpJsonConfig {
                    url: "https://jsonplaceholder.typicode.com/posts".to_string(),
                    topic: "example.posts".to_string(),
                    headers,
                    records_pointer: None,
                    key_field: Some("id".to_string()),
                    priority: Priority::Normal,
                }),
            }],
        }
    }

    pub fn enabled_connectors(&self) -> usize {
        self.connectors
            .iter()
            .filter(|entry| entry.connector.enabled)
            .count()
    }
}
