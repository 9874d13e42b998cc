/*!
 * Sluice CLI - Command Line Interface
 */

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use sluice::{
    config::{LogLevel, SluiceConfig},
    error::{SluiceError, EXIT_RUNTIME, EXIT_SUCCESS},
    logging, Application,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "sluice")]
#[command(version, about = "Poll external sources into a message bus with rate limiting and circuit breaking", long_about = None)]
struct Cli {
    /// Log level (overrides the configuration file)
    #[arg(long = "log-level", value_enum, global = true)]
    log_level: Option<LogLevelArg>,

    /// Verbose output (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start every configured connector and run until Ctrl-C
    Run {
        /// Configuration file
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,
    },

    /// Parse and validate a configuration file
    Validate {
        /// Configuration file
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,
    },

    /// Print a sample configuration
    Init {
        /// Write to this file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

#[tokio::main]
async fn main() {
    let code = match run(Cli::parse()).await {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            e.downcast_ref::<SluiceError>()
                .map_or(EXIT_RUNTIME, SluiceError::exit_code)
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Init { output } => init(output),
        Commands::Validate { config } => validate(&config),
        Commands::Run { config } => {
            let mut config = SluiceConfig::from_file(&config)?;
            if let Some(level) = cli.log_level {
                config.logging.level = level.into();
            }
            config.logging.verbose |= cli.verbose;
            logging::init_logging(&config.logging)?;

            serve(&config).await
        }
    }
}

fn init(output: Option<PathBuf>) -> anyhow::Result<()> {
    let sample = SluiceConfig::sample();
    match output {
        Some(path) => {
            sample.to_file(&path)?;
            println!("Wrote sample configuration to {}", path.display());
        }
        None => print!("{}", sample.to_toml()?),
    }
    Ok(())
}

fn validate(path: &Path) -> anyhow::Result<()> {
    let config = SluiceConfig::from_file(path)?;
    config.validate()?;

    println!("Configuration OK: {}", path.display());
    println!("  bus:        {:?}", config.bus.mode);
    println!(
        "  connectors: {} ({} enabled)",
        config.connectors.len(),
        config.enabled_connectors()
    );
    for entry in &config.connectors {
        println!(
            "    - {} [{}] -> {} every {}s",
            entry.connector.name,
            entry.source.kind(),
            entry.source.topic(),
            entry.connector.poll_interval_seconds
        );
    }
    Ok(())
}

async fn serve(config: &SluiceConfig) -> anyhow::Result<()> {
    let app = Application::assemble(config).await?;
    app.start().await?;
    info!("Sluice running, press Ctrl-C to stop");

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C, shutting down");
    }

    info!("Shutting down");
    app.stop().await;

    let stats = app.stats().await;
    let report = serde_json::to_string_pretty(&stats).context("failed to encode final stats")?;
    println!("{}", report);
    Ok(())
}
