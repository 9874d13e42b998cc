//! Ingestion Manager: connector lifecycle and the health-check loop
//!
//! The manager owns the set of registered connectors and drives them
//! together with the message bus and stream processor:
//!
//! - **start_all**: bus, then processor, then every connector, then the
//!   health loop
//! - **stop_all**: the reverse, so no connector publishes to a bus that is
//!   already disconnected
//! - **health loop**: every interval, snapshot health, restart UNHEALTHY
//!   connectors and publish the snapshot to the bus

use crate::error::SentinelError;
use crate::health::{HealthSnapshot, ManagerStats};
use crate::policy::ManagerPolicy;
use sluice_bus::{MessageBus, Priority, StreamProcessor};
use sluice_connect::{ConnectorSnapshot, ManagedConnector};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

type Registry = HashMap<String, Arc<dyn ManagedConnector>>;

/// State shared with the health-check task
struct Shared {
    bus: Arc<dyn MessageBus>,
    processor: Arc<dyn StreamProcessor>,
    policy: ManagerPolicy,
    connectors: RwLock<Registry>,
}

/// Coordinates connectors, the message bus and the stream processor
///
/// Constructed once by the application and shared by reference; there is no
/// global instance.
///
/// # Example
///
/// ```rust
/// use sluice_bus::{BusBackend, IdleProcessor};
/// use sluice_sentinel::{IngestionManager, ManagerPolicy, OverallStatus};
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), sluice_sentinel::SentinelError> {
/// let manager = IngestionManager::new(
///     Arc::new(BusBackend::in_memory(100)),
///     Arc::new(IdleProcessor::new()),
///     ManagerPolicy::default(),
/// )?;
///
/// manager.start_all().await?;
/// assert_eq!(manager.get_health().await.status, OverallStatus::Healthy);
/// manager.stop_all().await;
/// # Ok(())
/// # }
/// ```
pub struct IngestionManager {
    shared: Arc<Shared>,
    running: AtomicBool,
    health_task: Mutex<Option<JoinHandle<()>>>,
}

impl IngestionManager {
    pub fn new(
        bus: Arc<dyn MessageBus>,
        processor: Arc<dyn StreamProcessor>,
        policy: ManagerPolicy,
    ) -> Result<Self, SentinelError> {
        policy.validate()?;

        Ok(Self {
            shared: Arc::new(Shared {
                bus,
                processor,
                policy,
                connectors: RwLock::new(HashMap::new()),
            }),
            running: AtomicBool::new(false),
            health_task: Mutex::new(None),
        })
    }

    pub fn policy(&self) -> &ManagerPolicy {
        &self.shared.policy
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Insert a connector, replacing any previous one with the same name
    pub async fn register_connector(
        &self,
        name: impl Into<String>,
        connector: Arc<dyn ManagedConnector>,
    ) {
        let name = name.into();
        info!(connector = %name, id = %connector.id(), "Registering connector");

        let replaced = self
            .shared
            .connectors
            .write()
            .await
            .insert(name.clone(), connector);
        if replaced.is_some() {
            warn!(connector = %name, "Replaced previously registered connector");
        }
    }

    /// Remove a connector if present; the removed connector is not stopped
    pub async fn unregister_connector(&self, name: &str) {
        if self.shared.connectors.write().await.remove(name).is_some() {
            info!(connector = %name, "Unregistered connector");
        } else {
            debug!(connector = %name, "Unregister ignored, connector not found");
        }
    }

    pub async fn connector_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.shared.connectors.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Connect the bus, start the processor and every connector, then launch
    /// the health loop
    ///
    /// A failing connector is logged and skipped. Bus or processor failures
    /// abort the start and leave the manager stopped.
    pub async fn start_all(&self) -> Result<(), SentinelError> {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Ingestion manager already running");
            return Ok(());
        }

        info!(
            health_check_interval_s = self.shared.policy.health_check_interval_s,
            auto_restart = self.shared.policy.auto_restart,
            "Starting ingestion manager"
        );

        if let Err(e) = self.shared.bus.connect().await {
            self.running.store(false, Ordering::SeqCst);
            error!(error = %e, "Failed to connect message bus");
            return Err(e.into());
        }

        if let Err(e) = self.shared.processor.start().await {
            error!(error = %e, "Failed to start stream processor");
            if let Err(e) = self.shared.bus.disconnect().await {
                warn!(error = %e, "Failed to disconnect message bus");
            }
            self.running.store(false, Ordering::SeqCst);
            return Err(e.into());
        }

        let mut started = 0usize;
        let connectors = self.shared.snapshot_registry().await;
        for (name, connector) in &connectors {
            match connector.start().await {
                Ok(()) => started += 1,
                Err(e) => error!(connector = %name, error = %e, "Failed to start connector"),
            }
        }

        let shared = self.shared.clone();
        *self.health_task.lock().await = Some(tokio::spawn(health_loop(shared)));

        info!(
            started,
            total = connectors.len(),
            "Ingestion manager started"
        );
        Ok(())
    }

    /// Stop the health loop, every connector, the processor and the bus
    ///
    /// Failures are logged per component and never stop the rest.
    pub async fn stop_all(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            debug!("Ingestion manager not running");
            return;
        }

        info!("Stopping ingestion manager");

        if let Some(handle) = self.health_task.lock().await.take() {
            handle.abort();
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "Health loop ended abnormally");
                }
            }
        }

        for (name, connector) in self.shared.snapshot_registry().await {
            if let Err(e) = connector.stop().await {
                error!(connector = %name, error = %e, "Failed to stop connector");
            }
        }

        if let Err(e) = self.shared.processor.stop().await {
            error!(error = %e, "Failed to stop stream processor");
        }

        if let Err(e) = self.shared.bus.disconnect().await {
            error!(error = %e, "Failed to disconnect message bus");
        }

        info!("Ingestion manager stopped");
    }

    /// Stop, pause, then start one connector
    ///
    /// Returns false if the name is unknown or either step fails.
    pub async fn restart_connector(&self, name: &str) -> bool {
        self.shared.restart_connector(name).await
    }

    /// Health of every connector plus bus and processor state
    pub async fn get_health(&self) -> HealthSnapshot {
        self.shared.health().await
    }

    pub async fn get_connector_stats(&self, name: &str) -> Option<ConnectorSnapshot> {
        self.shared
            .connectors
            .read()
            .await
            .get(name)
            .map(|connector| connector.snapshot())
    }

    pub async fn get_all_stats(&self) -> ManagerStats {
        let connectors = self
            .shared
            .connectors
            .read()
            .await
            .iter()
            .map(|(name, connector)| (name.clone(), connector.snapshot()))
            .collect();

        ManagerStats {
            running: self.is_running(),
            connectors,
            bus: self.shared.bus.stats(),
            processor: self.shared.processor.stats(),
        }
    }
}

impl Shared {
    /// Clone the registry so no lock is held while awaiting connectors
    async fn snapshot_registry(&self) -> Vec<(String, Arc<dyn ManagedConnector>)> {
        let mut entries: Vec<_> = self
            .connectors
            .read()
            .await
            .iter()
            .map(|(name, connector)| (name.clone(), connector.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    async fn health(&self) -> HealthSnapshot {
        let statuses: Vec<_> = self
            .connectors
            .read()
            .await
            .iter()
            .map(|(name, connector)| (name.clone(), connector.status()))
            .collect();

        HealthSnapshot::compute(
            statuses,
            self.bus.stats().connected,
            self.processor.stats().running,
        )
    }

    async fn restart_connector(&self, name: &str) -> bool {
        let connector = self.connectors.read().await.get(name).cloned();
        let Some(connector) = connector else {
            warn!(connector = %name, "Cannot restart unknown connector");
            return false;
        };

        info!(connector = %name, "Restarting connector");

        if let Err(e) = connector.stop().await {
            error!(connector = %name, error = %e, "Restart failed while stopping");
            return false;
        }

        tokio::time::sleep(self.policy.restart_pause()).await;

        if let Err(e) = connector.start().await {
            error!(connector = %name, error = %e, "Restart failed while starting");
            return false;
        }

        true
    }

    /// One health-check iteration
    async fn check_health(&self) -> Result<(), SentinelError> {
        let snapshot = self.health().await;
        info!("{}", snapshot.summary());

        if self.policy.auto_restart {
            let unhealthy: Vec<String> = snapshot
                .unhealthy_connectors()
                .map(str::to_string)
                .collect();
            for name in unhealthy {
                warn!(connector = %name, "Connector unhealthy, restarting");
                if !self.restart_connector(&name).await {
                    error!(connector = %name, "Automatic restart failed");
                }
            }
        }

        let payload = serde_json::to_value(&snapshot)?;
        self.bus
            .publish(&self.policy.health_topic, payload, None, Some(Priority::Low))
            .await?;
        Ok(())
    }
}

async fn health_loop(shared: Arc<Shared>) {
    let interval = shared.policy.health_check_interval();
    loop {
        tokio::time::sleep(interval).await;

        if let Err(e) = shared.check_health().await {
            error!(error = %e, "Health check failed");
        }
    }
}
