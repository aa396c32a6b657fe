// src/ingest/source.rs
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::mpsc;

use crate::error::SourceError;
use crate::pipeline::InboundTweetEvent;

#[async_trait]
pub trait TweetSource: Send {
    /// Next inbound record; `None` once the stream is exhausted.
    async fn next_event(&mut self) -> Option<Result<InboundTweetEvent, SourceError>>;
    fn name(&self) -> &'static str;
}

/// One JSON object per line (stdin, files, pipes). Blank lines are skipped.
pub struct JsonLinesSource<R> {
    lines: Lines<R>,
    done: bool,
}

impl<R: AsyncBufRead + Unpin> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            done: false,
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> TweetSource for JsonLinesSource<R> {
    async fn next_event(&mut self) -> Option<Result<InboundTweetEvent, SourceError>> {
        if self.done {
            return None;
        }
        loop {
            match self.lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => return Some(serde_json::from_str(&line).map_err(SourceError::from)),
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    // A broken reader does not recover; end the stream after reporting.
                    self.done = true;
                    return Some(Err(e.into()));
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "jsonl"
    }
}

/// Fed by the HTTP ingest endpoint. Ends when every sender is dropped.
pub struct ChannelSource {
    rx: mpsc::Receiver<InboundTweetEvent>,
}

impl ChannelSource {
    pub fn new(rx: mpsc::Receiver<InboundTweetEvent>) -> Self {
        Self { rx }
    }

    /// Bounded channel pair; `capacity` is the ingest backlog.
    pub fn channel(capacity: usize) -> (mpsc::Sender<InboundTweetEvent>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self::new(rx))
    }
}

#[async_trait]
impl TweetSource for ChannelSource {
    async fn next_event(&mut self) -> Option<Result<InboundTweetEvent, SourceError>> {
        self.rx.recv().await.map(Ok)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
