// src/publish/mod.rs
pub mod http;
pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;

use crate::error::{PublishError, SinkError};
use crate::sentiment::{Dimension, SentimentScoreSet};

pub use http::HttpSink;
pub use memory::{LogSink, MemorySink};

/// Content-type tag on every outbound message: the payload is a JSON scalar.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// One score dimension of one tweet, ready for the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundSentimentMessage {
    pub key: String,
    pub value: f64,
    pub content_type: &'static str,
}

impl OutboundSentimentMessage {
    pub fn new(bucket_ms: i64, dimension: Dimension, value: f64) -> Self {
        Self {
            key: message_key(bucket_ms, dimension),
            value,
            content_type: CONTENT_TYPE_JSON,
        }
    }

    /// JSON payload (`94.0`, `0.1`, ...).
    pub fn payload(&self) -> String {
        serde_json::Value::from(self.value).to_string()
    }
}

/// `"{epochMillis}-{Dimension}"`.
pub fn message_key(bucket_ms: i64, dimension: Dimension) -> String {
    format!("{bucket_ms}-{}", dimension.as_str())
}

/// Outbound half of the stream adapter. Takes ownership of each message.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, msg: OutboundSentimentMessage) -> Result<(), SinkError>;
    fn name(&self) -> &'static str;
}

pub type DynSink = Arc<dyn MessageSink>;

/// Outcome of one fan-out: which dimensions went out, which failed.
#[derive(Debug, Default)]
pub struct PublishReport {
    pub sent: Vec<Dimension>,
    pub failures: Vec<PublishError>,
}

impl PublishReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn attempted(&self) -> usize {
        self.sent.len() + self.failures.len()
    }

    pub fn into_result(self) -> Result<(), Vec<PublishError>> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(self.failures)
        }
    }
}

/// Emits one message per dimension. Every dimension is attempted even when an
/// earlier one fails.
#[derive(Clone)]
pub struct FanoutPublisher {
    sink: DynSink,
    timeout: Duration,
}

impl FanoutPublisher {
    pub fn new(sink: DynSink, timeout: Duration) -> Self {
        Self { sink, timeout }
    }

    pub async fn publish(&self, bucket_ms: i64, scores: &SentimentScoreSet) -> PublishReport {
        let mut report = PublishReport::default();

        for (dimension, value) in scores.iter() {
            let msg = OutboundSentimentMessage::new(bucket_ms, dimension, value);
            let key = msg.key.clone();
            tracing::debug!(%key, value, "sending sentiment message");

            let res = match tokio::time::timeout(self.timeout, self.sink.send(msg)).await {
                Ok(r) => r,
                Err(_) => Err(SinkError::Timeout(self.timeout.as_millis() as u64)),
            };

            match res {
                Ok(()) => {
                    counter!("sentiment_messages_published_total", "dimension" => dimension.as_str())
                        .increment(1);
                    report.sent.push(dimension);
                }
                Err(source) => {
                    counter!("sentiment_publish_errors_total", "dimension" => dimension.as_str())
                        .increment(1);
                    let err = PublishError {
                        dimension,
                        key,
                        source,
                    };
                    tracing::warn!(error = %err, sink = self.sink.name(), "publish failed");
                    report.failures.push(err);
                }
            }
        }

        report
    }
}
