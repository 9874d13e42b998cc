//! Downstream stream processors
//!
//! The ingestion manager starts a processor after the bus connects and stops
//! it before the bus disconnects. It only relies on `start`, `stop` and the
//! `running` flag in `stats`.

use crate::backend::BusBackend;
use crate::error::BusError;
use crate::message::BusMessage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Counters reported by a stream processor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessorStats {
    pub running: bool,
    pub messages_processed: u64,
    /// Messages missed because the consumer fell behind
    pub messages_lagged: u64,
    pub per_topic: BTreeMap<String, u64>,
}

#[async_trait]
pub trait StreamProcessor: Send + Sync {
    async fn start(&self) -> Result<(), BusError>;

    async fn stop(&self) -> Result<(), BusError>;

    fn stats(&self) -> ProcessorStats;
}

/// Processor that does no work, only tracks whether it was started
#[derive(Debug, Default)]
pub struct IdleProcessor {
    running: AtomicBool,
}

impl IdleProcessor {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StreamProcessor for IdleProcessor {
    async fn start(&self) -> Result<(), BusError> {
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<(), BusError> {
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn stats(&self) -> ProcessorStats {
        ProcessorStats {
            running: self.running.load(Ordering::SeqCst),
            ..Default::default()
        }
    }
}

#[derive(Debug, Default)]
struct TapCounts {
    processed: u64,
    lagged: u64,
    per_topic: BTreeMap<String, u64>,
}

/// Consumes the in-memory firehose and tallies messages per topic
pub struct TopicTap {
    bus: Arc<BusBackend>,
    counts: Arc<Mutex<TapCounts>>,
    task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl TopicTap {
    pub fn new(bus: Arc<BusBackend>) -> Self {
        Self {
            bus,
            counts: Arc::new(Mutex::new(TapCounts::default())),
            task: tokio::sync::Mutex::new(None),
        }
    }

    /// Messages seen on one topic since the tap started
    pub fn topic_count(&self, topic: &str) -> u64 {
        lock(&self.counts).per_topic.get(topic).copied().unwrap_or(0)
    }
}

fn lock(counts: &Mutex<TapCounts>) -> MutexGuard<'_, TapCounts> {
    counts.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn run_tap(mut rx: broadcast::Receiver<BusMessage>, counts: Arc<Mutex<TapCounts>>) {
    loop {
        match rx.recv().await {
            Ok(message) => {
                let mut counts = lock(&counts);
                counts.processed += 1;
                *counts.per_topic.entry(message.topic).or_insert(0) += 1;
            }
            Err(RecvError::Lagged(missed)) => {
                warn!(missed, "Topic tap fell behind the firehose");
                lock(&counts).lagged += missed;
            }
            Err(RecvError::Closed) => {
                debug!("Firehose closed, topic tap exiting");
                break;
            }
        }
    }
}

#[async_trait]
impl StreamProcessor for TopicTap {
    async fn start(&self) -> Result<(), BusError> {
        let mut task = self.task.lock().await;
        if task.is_some() {
            return Ok(());
        }

        let bus = self.bus.as_in_memory().ok_or_else(|| {
            BusError::Processor("topic tap requires the in-memory bus".to_string())
        })?;

        let rx = bus.subscribe();
        *task = Some(tokio::spawn(run_tap(rx, self.counts.clone())));
        info!("Topic tap started");
        Ok(())
    }

    async fn stop(&self) -> Result<(), BusError> {
        let handle = self.task.lock().await.take();
        if let Some(handle) = handle {
            handle.abort();
            let _ = handle.await;
            info!("Topic tap stopped");
        }
        Ok(())
    }

    fn stats(&self) -> ProcessorStats {
        let running = self
            .task
            .try_lock()
            .map(|task| task.as_ref().is_some_and(|handle| !handle.is_finished()))
            .unwrap_or(true);
        let counts = lock(&self.counts);

        ProcessorStats {
            running,
            messages_processed: counts.processed,
            messages_lagged: counts.lagged,
            per_topic: counts.per_topic.clone(),
        }
    }
}
