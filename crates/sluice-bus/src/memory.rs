//! In-process message bus
//!
//! Keeps a bounded history per topic and fans every accepted message out on
//! a broadcast "firehose" so stream processors can consume it.

use crate::error::BusError;
use crate::message::{validate_topic, BusKind, BusMessage, BusStats, MessageBus, Priority};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Default number of messages retained per topic
pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

#[derive(Debug, Default)]
struct MemoryState {
    connected: bool,
    messages_published: u64,
    publish_failures: u64,
    history: HashMap<String, VecDeque<BusMessage>>,
}

/// Message bus held entirely in memory
#[derive(Debug)]
pub struct InMemoryBus {
    history_limit: usize,
    state: Mutex<MemoryState>,
    firehose: broadcast::Sender<BusMessage>,
}

impl InMemoryBus {
    pub fn new(history_limit: usize) -> Self {
        let (firehose, _) = broadcast::channel(history_limit.max(16));
        Self {
            history_limit,
            state: Mutex::new(MemoryState::default()),
            firehose,
        }
    }

    /// Receive every message published from now on, across all topics
    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.firehose.subscribe()
    }

    /// Retained messages for a topic, oldest first
    pub fn messages(&self, topic: &str) -> Vec<BusMessage> {
        self.lock()
            .history
            .get(topic)
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Topics that have received at least one message
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.lock().history.keys().cloned().collect();
        topics.sort();
        topics
    }

    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

#[async_trait]
impl MessageBus for InMemoryBus {
    async fn connect(&self) -> Result<(), BusError> {
        self.lock().connected = true;
        info!("In-memory message bus connected");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BusError> {
        self.lock().connected = false;
        info!("In-memory message bus disconnected");
        Ok(())
    }

    async fn publish(
        &self,
        topic: &str,
        payload: serde_json::Value,
        key: Option<&str>,
        priority: Option<Priority>,
    ) -> Result<BusMessage, BusError> {
        let message = {
            let mut state = self.lock();
            if !state.connected {
                state.publish_failures += 1;
                return Err(BusError::NotConnected);
            }
            if let Err(e) = validate_topic(topic) {
                state.publish_failures += 1;
                return Err(e);
            }

            let message = BusMessage::new(topic, payload, key, priority);
            let queue = state.history.entry(topic.to_string()).or_default();
            queue.push_back(message.clone());
            while queue.len() > self.history_limit {
                queue.pop_front();
            }
            state.messages_published += 1;
            message
        };

        // No subscribers is fine
        let _ = self.firehose.send(message.clone());
        debug!(topic, id = %message.id, "Published message");

        Ok(message)
    }

    fn stats(&self) -> BusStats {
        let state = self.lock();
        BusStats {
            backend: BusKind::InMemory,
            connected: state.connected,
            messages_published: state.messages_published,
            publish_failures: state.publish_failures,
            topics: state.history.len(),
        }
    }
}
