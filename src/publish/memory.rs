// src/publish/memory.rs
use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{MessageSink, OutboundSentimentMessage};
use crate::error::SinkError;
use crate::sentiment::Dimension;

/// Writes every message through `tracing`; used for dry runs.
pub struct LogSink;

#[async_trait]
impl MessageSink for LogSink {
    async fn send(&self, msg: OutboundSentimentMessage) -> Result<(), SinkError> {
        tracing::info!(
            target: "sentiment_out",
            key = %msg.key,
            value = msg.value,
            content_type = msg.content_type,
            "sentiment message"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

// --- Test helper ---

/// Collects messages in memory. Can be told to fail chosen dimensions.
#[derive(Default)]
pub struct MemorySink {
    sent: Mutex<Vec<OutboundSentimentMessage>>,
    fail_on: HashSet<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every message whose key ends with one of these dimensions.
    pub fn failing_on<I: IntoIterator<Item = Dimension>>(mut self, dims: I) -> Self {
        self.fail_on = dims.into_iter().map(|d| format!("-{d}")).collect();
        self
    }

    pub fn messages(&self) -> Vec<OutboundSentimentMessage> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl MessageSink for MemorySink {
    async fn send(&self, msg: OutboundSentimentMessage) -> Result<(), SinkError> {
        if self.fail_on.iter().any(|suffix| msg.key.ends_with(suffix)) {
            return Err(SinkError::Transport(format!("refused {}", msg.key)));
        }
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(msg);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
