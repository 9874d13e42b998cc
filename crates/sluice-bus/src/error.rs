//! Error types for the sluice-bus crate

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BusError {
    #[error("Message bus is not connected")]
    NotConnected,

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Broker rejected publish to {topic}: HTTP {status}")]
    Rejected { topic: String, status: u16 },

    #[error("Connection to broker at {url} failed: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Invalid topic name: {0:?}")]
    InvalidTopic(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stream processor error: {0}")]
    Processor(String),
}
