/*!
 * Logging and tracing initialization
 */

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::config::LoggingConfig;
use crate::error::{Result, SluiceError};

/// Crates whose events are shown at the configured level
const SLUICE_TARGETS: [&str; 5] = [
    "sluice",
    "sluice_bus",
    "sluice_connect",
    "sluice_core_resilience",
    "sluice_sentinel",
];

/// Effective level after the verbose override
pub fn effective_level(config: &LoggingConfig) -> Level {
    if config.verbose {
        Level::DEBUG
    } else {
        config.level.to_tracing_level()
    }
}

/// Filter directive enabling every sluice crate at `level`
pub fn default_directive(level: Level) -> String {
    SLUICE_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global subscriber described by `config`
///
/// Stdout gets compact human-readable lines. A log file gets one JSON object
/// per event, appended so restarts keep earlier history. `RUST_LOG`, when
/// set, replaces the configured level entirely. Fails if a global subscriber
/// is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(effective_level(config))))
        .map_err(|e| SluiceError::Config(format!("Failed to create log filter: {}", e)))?;

    let output: Box<dyn Layer<Registry> + Send + Sync> = match &config.file {
        Some(path) => fmt::layer()
            .json()
            .with_writer(Mutex::new(open_log_file(path)?))
            .with_ansi(false)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_span_events(FmtSpan::CLOSE)
            .boxed(),
        None => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(output)
        .with(env_filter)
        .try_init()
        .map_err(|e| SluiceError::Config(format!("Logging already initialized: {}", e)))
}

/// Open `path` for appending, creating it and its parent directories
pub fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            SluiceError::Config(format!("Failed to open log file {}: {}", path.display(), e))
        })
}
