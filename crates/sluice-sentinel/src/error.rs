//! Error types for the sluice-sentinel crate

use sluice_bus::BusError;
use sluice_connect::ConnectorError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SentinelError {
    #[error("Invalid manager policy: {0}")]
    InvalidPolicy(String),

    #[error("Connector not found: {0}")]
    ConnectorNotFound(String),

    #[error("Message bus error: {0}")]
    Bus(#[from] BusError),

    #[error("Connector error: {0}")]
    Connector(#[from] ConnectorError),

    #[error("Failed to encode health snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}
