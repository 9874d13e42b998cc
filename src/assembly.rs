/*!
 * Application assembly
 *
 * Builds the bus, the stream processor, the ingestion manager and one
 * connector per configured source, and owns their lifecycle. Nothing here
 * is global: every component is constructed once and passed down.
 */

use crate::config::SluiceConfig;
use crate::error::Result;
use crate::sources::{HttpJsonSource, SourceConfig};
use sluice_bus::{BusBackend, BusMode, IdleProcessor, MessageBus, StreamProcessor, TopicTap};
use sluice_connect::Connector;
use sluice_sentinel::{HealthSnapshot, IngestionManager, ManagerStats};
use std::sync::Arc;
use tracing::info;

/// A fully wired ingestion pipeline
pub struct Application {
    bus: Arc<BusBackend>,
    manager: Arc<IngestionManager>,
}

impl Application {
    /// Validate `config` and construct every component it describes
    ///
    /// Nothing is connected or started yet.
    pub async fn assemble(config: &SluiceConfig) -> Result<Self> {
        config.validate()?;

        let bus = Arc::new(match config.bus.mode {
            BusMode::Memory => BusBackend::in_memory(config.bus.history_limit),
            BusMode::KafkaRest => BusBackend::kafka_rest(config.bus.kafka_rest())?,
        });

        let processor: Arc<dyn StreamProcessor> = match config.bus.mode {
            BusMode::Memory => Arc::new(TopicTap::new(bus.clone())),
            BusMode::KafkaRest => Arc::new(IdleProcessor::new()),
        };

        let manager = Arc::new(IngestionManager::new(
            bus.clone(),
            processor,
            config.manager.clone(),
        )?);

        for entry in &config.connectors {
            let name = entry.connector.name.clone();
            match &entry.source {
                SourceConfig::HttpJson(source_config) => {
                    let source = HttpJsonSource::new(source_config.clone(), bus.clone());
                    let connector = Connector::new(entry.connector.clone(), source)?;
                    manager.register_connector(name, Arc::new(connector)).await;
                }
            }
        }

        info!(
            bus = ?config.bus.mode,
            connectors = config.connectors.len(),
            "Application assembled"
        );

        Ok(Self { bus, manager })
    }

    pub fn manager(&self) -> &Arc<IngestionManager> {
        &self.manager
    }

    pub fn bus(&self) -> &Arc<BusBackend> {
        &self.bus
    }

    /// Connect the bus and start every connector
    pub async fn start(&self) -> Result<()> {
        self.manager.start_all().await?;
        Ok(())
    }

    /// Stop connectors, then the processor, then disconnect the bus
    pub async fn stop(&self) {
        self.manager.stop_all().await;
    }

    pub async fn health(&self) -> HealthSnapshot {
        self.manager.get_health().await
    }

    pub async fn stats(&self) -> ManagerStats {
        self.manager.get_all_stats().await
    }

    pub fn bus_connected(&self) -> bool {
        self.bus.stats().connected
    }
}
