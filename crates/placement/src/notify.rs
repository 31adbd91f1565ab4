//! Notification sink contract and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

/// Error returned by a notification sink.
#[derive(Debug, Error)]
#[error("Notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Contract for the external messaging sink.
///
/// Delivery is best-effort from the placement workflow's point of view:
/// failures are logged and swallowed because the order is already durably
/// committed by the time a notification is sent.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Sends a human-readable message to a topic.
    async fn send(&self, topic: &str, message: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Default)]
struct SinkState {
    messages: Vec<(String, String)>,
    fail_on_send: bool,
}

/// In-memory notification sink for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationSink {
    state: Arc<RwLock<SinkState>>,
}

impl InMemoryNotificationSink {
    /// Creates a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent sends fail.
    pub fn set_fail_on_send(&self, fail: bool) {
        self.state.write().unwrap().fail_on_send = fail;
    }

    /// Returns the number of delivered messages.
    pub fn message_count(&self) -> usize {
        self.state.read().unwrap().messages.len()
    }

    /// Returns the delivered messages for a topic.
    pub fn messages_for(&self, topic: &str) -> Vec<String> {
        self.state
            .read()
            .unwrap()
            .messages
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

#[async_trait]
impl NotificationSink for InMemoryNotificationSink {
    async fn send(&self, topic: &str, message: &str) -> Result<(), NotifyError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_send {
            return Err(NotifyError("injected delivery failure".to_string()));
        }
        state.messages.push((topic.to_string(), message.to_string()));
        Ok(())
    }
}
