// src/publish/http.rs
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

use super::{MessageSink, OutboundSentimentMessage};
use crate::error::SinkError;

/// Header carrying the partition key.
pub const KEY_HEADER: &str = "x-message-key";

/// POSTs each message to a broker bridge / REST proxy. No retries; a failed
/// dimension is reported back to the fan-out.
#[derive(Clone)]
pub struct HttpSink {
    endpoint: String,
    client: Client,
    timeout: Duration,
}

impl HttpSink {
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            client: Client::new(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl MessageSink for HttpSink {
    async fn send(&self, msg: OutboundSentimentMessage) -> Result<(), SinkError> {
        let body = msg.payload();
        let rsp = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .header(KEY_HEADER, msg.key)
            .header(CONTENT_TYPE, msg.content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SinkError::Timeout(self.timeout.as_millis() as u64)
                } else {
                    SinkError::Transport(e.to_string())
                }
            })?;

        let status = rsp.status();
        if !status.is_success() {
            return Err(SinkError::Status(status.as_u16()));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
