/*!
 * Error types for Sluice
 */

use sluice_bus::BusError;
use sluice_connect::ConnectorError;
use sluice_sentinel::SentinelError;
use std::fmt;
use std::io;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, SluiceError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_RUNTIME: i32 = 1;
pub const EXIT_CONFIG: i32 = 2;

#[derive(Debug)]
pub enum SluiceError {
    /// Configuration file missing
    ConfigNotFound(PathBuf),

    /// Configuration invalid or unparseable
    Config(String),

    /// I/O error
    Io(io::Error),

    /// Message bus failure
    Bus(BusError),

    /// Connector construction or lifecycle failure
    Connector(ConnectorError),

    /// Ingestion manager failure
    Manager(SentinelError),
}

impl SluiceError {
    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            SluiceError::ConfigNotFound(_) | SluiceError::Config(_) => EXIT_CONFIG,
            SluiceError::Connector(ConnectorError::InvalidConfig(_)) => EXIT_CONFIG,
            SluiceError::Manager(SentinelError::InvalidPolicy(_)) => EXIT_CONFIG,
            _ => EXIT_RUNTIME,
        }
    }

    /// Whether the error came from configuration rather than the runtime
    pub fn is_config_error(&self) -> bool {
        self.exit_code() == EXIT_CONFIG
    }
}

impl fmt::Display for SluiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SluiceError::ConfigNotFound(path) => {
                write!(f, "Configuration file not found: {}", path.display())
            }
            SluiceError::Config(msg) => {
                write!(f, "Configuration error: {}", msg)
            }
            SluiceError::Io(err) => {
                write!(f, "I/O error: {}", err)
            }
            SluiceError::Bus(err) => {
                write!(f, "Message bus error: {}", err)
            }
            SluiceError::Connector(err) => {
                write!(f, "Connector error: {}", err)
            }
            SluiceError::Manager(err) => {
                write!(f, "Ingestion manager error: {}", err)
            }
        }
    }
}

impl std::error::Error for SluiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SluiceError::Io(err) => Some(err),
            SluiceError::Bus(err) => Some(err),
            SluiceError::Connector(err) => Some(err),
            SluiceError::Manager(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for SluiceError {
    fn from(err: io::Error) -> Self {
        SluiceError::Io(err)
    }
}

impl From<toml::de::Error> for SluiceError {
    fn from(err: toml::de::Error) -> Self {
        SluiceError::Config(format!("TOML parse error: {}", err))
    }
}

impl From<toml::ser::Error> for SluiceError {
    fn from(err: toml::ser::Error) -> Self {
        SluiceError::Config(format!("TOML serialize error: {}", err))
    }
}

impl From<BusError> for SluiceError {
    fn from(err: BusError) -> Self {
        SluiceError::Bus(err)
    }
}

impl From<ConnectorError> for SluiceError {
    fn from(err: ConnectorError) -> Self {
        SluiceError::Connector(err)
    }
}

impl From<SentinelError> for SluiceError {
    fn from(err: SentinelError) -> Self {
        SluiceError::Manager(err)
    }
}
