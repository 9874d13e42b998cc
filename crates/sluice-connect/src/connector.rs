//! Connector runtime
//!
//! A `Connector` wraps one `DataSource` with its own rate limiter and
//! circuit breaker and drives it from a background poll loop:
//!
//! 1. Skip the cycle (status UNHEALTHY) while the circuit refuses attempts
//! 2. Wait for a rate limiter token
//! 3. Fetch with retries, then ingest non-empty data
//! 4. Record the cycle outcome on the breaker and the counters
//! 5. Sleep the poll interval
//!
//! Failures never leave the loop; they surface only through `snapshot()`.

use crate::config::ConnectorConfig;
use crate::error::ConnectorError;
use crate::source::{DataSource, FetchFailure, FetchOutcome, Payload};
use crate::status::{ConnectorSnapshot, ConnectorStats, ConnectorStatus};
use async_trait::async_trait;
use chrono::Utc;
use sluice_core_resilience::{CircuitBreaker, RateLimiter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Floor for a single rate limiter sleep so an exhausted bucket never spins
const MIN_TOKEN_WAIT: Duration = Duration::from_millis(10);

/// Lifecycle surface the ingestion manager drives
///
/// Object safe, so a manager can hold connectors over different sources as
/// `Arc<dyn ManagedConnector>`.
#[async_trait]
pub trait ManagedConnector: Send + Sync {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    async fn start(&self) -> Result<(), ConnectorError>;

    async fn stop(&self) -> Result<(), ConnectorError>;

    fn status(&self) -> ConnectorStatus;

    fn is_running(&self) -> bool;

    fn snapshot(&self) -> ConnectorSnapshot;
}

/// Mutable state shared between the handle and its poll loop
#[derive(Debug)]
struct RuntimeState {
    status: ConnectorStatus,
    stats: ConnectorStats,
    breaker: CircuitBreaker,
    limiter: RateLimiter,
}

type SharedState = Arc<Mutex<RuntimeState>>;

fn lock(state: &Mutex<RuntimeState>) -> MutexGuard<'_, RuntimeState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Connector<S: DataSource> {
    id: String,
    config: Arc<ConnectorConfig>,
    source: Arc<tokio::sync::Mutex<S>>,
    state: SharedState,
    running: AtomicBool,
    /// Set by a successful `open`, cleared once `close` completes
    source_open: AtomicBool,
    task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl<S: DataSource> Connector<S> {
    /// Validate `config` and wrap `source`; nothing runs until `start`
    pub fn new(config: ConnectorConfig, source: S) -> Result<Self, ConnectorError> {
        config.validate()?;

        let status = if config.enabled {
            ConnectorStatus::Healthy
        } else {
            ConnectorStatus::Disabled
        };
        let state = RuntimeState {
            status,
            stats: ConnectorStats::default(),
            breaker: CircuitBreaker::new(config.circuit_breaker()),
            limiter: RateLimiter::new(config.rate_limit()),
        };

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            config: Arc::new(config),
            source: Arc::new(tokio::sync::Mutex::new(source)),
            state: Arc::new(Mutex::new(state)),
            running: AtomicBool::new(false),
            source_open: AtomicBool::new(false),
            task: tokio::sync::Mutex::new(None),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// Open the source and launch the poll loop
    ///
    /// A disabled connector only records `DISABLED`. Calling this while the
    /// loop is already running does nothing.
    pub async fn start(&self) -> Result<(), ConnectorError> {
        if !self.config.enabled {
            lock(&self.state).status = ConnectorStatus::Disabled;
            info!(connector = %self.config.name, "Connector disabled, not starting");
            return Ok(());
        }

        let mut task = self.task.lock().await;
        if task.is_some() {
            debug!(connector = %self.config.name, "Connector already running");
            return Ok(());
        }

        self.source.lock().await.open(&self.config).await?;
        self.source_open.store(true, Ordering::SeqCst);

        self.running.store(true, Ordering::SeqCst);
        *task = Some(tokio::spawn(poll_loop(
            self.config.clone(),
            self.source.clone(),
            self.state.clone(),
        )));

        info!(
            connector = %self.config.name,
            id = %self.id,
            poll_interval_secs = self.config.poll_interval_seconds,
            "Connector started"
        );
        Ok(())
    }

    /// Cancel the poll loop, wait for it to finish, then close the source
    ///
    /// No fetch or ingest happens after this returns. Stopping a connector
    /// that is not running does nothing. If a previous stop was cancelled
    /// before the source closed, this one closes it.
    pub async fn stop(&self) -> Result<(), ConnectorError> {
        let handle = self.task.lock().await.take();
        if let Some(handle) = handle {
            handle.abort();
            self.running.store(false, Ordering::SeqCst);
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!(connector = %self.config.name, error = %e, "Poll loop ended abnormally");
                }
            }
        }

        if !self.source_open.load(Ordering::SeqCst) {
            return Ok(());
        }

        self.source.lock().await.close().await?;
        self.source_open.store(false, Ordering::SeqCst);
        info!(connector = %self.config.name, "Connector stopped");
        Ok(())
    }

    pub fn status(&self) -> ConnectorStatus {
        lock(&self.state).status
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Point-in-time status, breaker state and counters
    pub fn snapshot(&self) -> ConnectorSnapshot {
        let state = lock(&self.state);
        ConnectorSnapshot {
            id: self.id.clone(),
            name: self.config.name.clone(),
            enabled: self.config.enabled,
            status: state.status,
            running: self.is_running(),
            circuit_breaker: state.breaker.snapshot(),
            rate_limiter: state.limiter.snapshot(),
            stats: state.stats.clone(),
        }
    }
}

#[async_trait]
impl<S: DataSource> ManagedConnector for Connector<S> {
    fn id(&self) -> &str {
        Connector::id(self)
    }

    fn name(&self) -> &str {
        Connector::name(self)
    }

    async fn start(&self) -> Result<(), ConnectorError> {
        Connector::start(self).await
    }

    async fn stop(&self) -> Result<(), ConnectorError> {
        Connector::stop(self).await
    }

    fn status(&self) -> ConnectorStatus {
        Connector::status(self)
    }

    fn is_running(&self) -> bool {
        Connector::is_running(self)
    }

    fn snapshot(&self) -> ConnectorSnapshot {
        Connector::snapshot(self)
    }
}

async fn poll_loop<S: DataSource>(
    config: Arc<ConnectorConfig>,
    source: Arc<tokio::sync::Mutex<S>>,
    state: SharedState,
) {
    let interval = config.poll_interval();
    loop {
        run_cycle(&config, &source, &state).await;

        if interval.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(interval).await;
        }
    }
}

async fn run_cycle<S: DataSource>(
    config: &ConnectorConfig,
    source: &tokio::sync::Mutex<S>,
    state: &Mutex<RuntimeState>,
) {
    let allowed = lock(state).breaker.can_attempt();
    if !allowed {
        lock(state).status = ConnectorStatus::Unhealthy;
        debug!(connector = %config.name, "Circuit open, skipping poll cycle");
        return;
    }

    wait_for_token(config, state).await;

    let outcome = {
        let mut source = source.lock().await;
        match fetch_with_retry(&mut *source, config, state).await {
            Ok(data) => {
                let count = data.record_count();
                if data.is_empty_payload() {
                    debug!(connector = %config.name, "Fetch returned no data");
                    Ok(0)
                } else {
                    source.ingest(data).await.map(|()| count)
                }
            }
            Err(e) => Err(e),
        }
    };

    let mut state = lock(state);
    match outcome {
        Ok(count) => {
            state.breaker.record_success();
            state.status = ConnectorStatus::Healthy;
            state.stats.requests_successful += 1;
            state.stats.records_ingested += count;
            state.stats.last_success = Some(Utc::now());
            if count > 0 {
                info!(connector = %config.name, records = count, "Ingested records");
            }
        }
        Err(e) => {
            state.breaker.record_failure();
            state.status = if state.breaker.is_open() {
                ConnectorStatus::Unhealthy
            } else {
                ConnectorStatus::Degraded
            };
            state.stats.requests_failed += 1;
            state.stats.last_error = Some(Utc::now());
            state.stats.last_error_message = Some(e.to_string());
            error!(
                connector = %config.name,
                error = %e,
                failures = state.breaker.failure_count(),
                "Poll cycle failed"
            );
        }
    }
}

/// Block until the rate limiter grants a token
async fn wait_for_token(config: &ConnectorConfig, state: &Mutex<RuntimeState>) {
    let cap = config.max_rate_limit_wait();
    loop {
        let wait = {
            let mut state = lock(state);
            if state.limiter.acquire() {
                return;
            }
            state.limiter.wait_time()
        };

        let pause = wait.min(cap).max(MIN_TOKEN_WAIT);
        debug!(
            connector = %config.name,
            wait_ms = pause.as_millis() as u64,
            "Rate limit reached, waiting for token"
        );
        tokio::time::sleep(pause).await;
    }
}

/// Up to `max_retries` fetch attempts
///
/// Retryable failures back off `retry_delay * factor^attempt` before the next
/// attempt, a remote 429 waits the fixed cooldown instead, and permanent
/// failures return at once. No delay follows the final attempt.
async fn fetch_with_retry<S: DataSource>(
    source: &mut S,
    config: &ConnectorConfig,
    state: &Mutex<RuntimeState>,
) -> Result<S::Item, ConnectorError> {
    let backoff = config.backoff();
    let mut last_error = None;

    for attempt in 0..config.max_retries {
        lock(state).stats.requests_total += 1;
        let attempts_left = attempt + 1 < config.max_retries;

        match source.fetch().await {
            FetchOutcome::Success(data) => return Ok(data),
            FetchOutcome::Permanent(failure) => {
                warn!(connector = %config.name, error = %failure, "Permanent fetch failure, not retrying");
                return Err(ConnectorError::Permanent(failure));
            }
            FetchOutcome::RateLimited => {
                warn!(
                    connector = %config.name,
                    attempt = attempt + 1,
                    cooldown_secs = config.rate_limit_cooldown_seconds,
                    "Source rate limited the request"
                );
                last_error = Some(ConnectorError::RemoteRateLimited {
                    attempts: attempt + 1,
                });
                if attempts_left {
                    tokio::time::sleep(config.rate_limit_cooldown()).await;
                }
            }
            FetchOutcome::Retryable(failure) => {
                warn!(
                    connector = %config.name,
                    attempt = attempt + 1,
                    max_retries = config.max_retries,
                    error = %failure,
                    "Fetch attempt failed"
                );
                last_error = Some(ConnectorError::RetriesExhausted {
                    attempts: attempt + 1,
                    last: failure,
                });
                if attempts_left {
                    tokio::time::sleep(backoff.delay(attempt)).await;
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| ConnectorError::RetriesExhausted {
        attempts: 0,
        last: FetchFailure::Other("no fetch attempted".to_string()),
    }))
}
