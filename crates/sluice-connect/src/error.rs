//! Error types for the sluice-connect crate

use crate::source::FetchFailure;
use sluice_core_resilience::ResilienceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("Invalid connector configuration: {0}")]
    InvalidConfig(String),

    #[error("Permanent fetch failure: {0}")]
    Permanent(FetchFailure),

    #[error("Fetch failed after {attempts} attempt(s): {last}")]
    RetriesExhausted { attempts: u32, last: FetchFailure },

    #[error("Source kept rate limiting after {attempts} attempt(s)")]
    RemoteRateLimited { attempts: u32 },

    #[error("Ingest failed: {0}")]
    Ingest(String),

    #[error("Failed to open source: {0}")]
    Open(String),

    #[error("Failed to close source: {0}")]
    Close(String),

    #[error(transparent)]
    Resilience(#[from] ResilienceError),
}
