//! Concrete data sources
//!
//! The set of source kinds is closed and selected per connector by the
//! `kind` tag of its `[connectors.source]` table.

pub mod http_json;

pub use http_json::{HttpJsonConfig, HttpJsonSource};

use serde::{Deserialize, Serialize};

/// Source settings of one connector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SourceConfig {
    /// Poll a URL returning JSON and publish each record
    HttpJson(HttpJsonConfig),
}

impl SourceConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            SourceConfig::HttpJson(_) => "http-json",
        }
    }

    pub fn topic(&self) -> &str {
        match self {
            SourceConfig::HttpJson(config) => &config.topic,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            SourceConfig::HttpJson(config) => config.validate(),
        }
    }
}
