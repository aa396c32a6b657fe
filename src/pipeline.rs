//! # Enrichment pipeline
//! One inbound tweet in, four sentiment messages out.
//!
//! Stages run strictly in sequence for an event: decode, derive the hour
//! bucket, classify, normalize, publish. Decode, parse and classifier errors
//! end the event before anything is published. Publish failures are per
//! dimension: they are reported in the outcome but the event still completes.

use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};

use crate::bucket::{derive_hour_bucket, ProcessingZone};
use crate::classifier::DynClassifier;
use crate::codec::decode_tweet;
use crate::error::{ClassifierError, PipelineError, PublishError};
use crate::publish::{DynSink, FanoutPublisher};
use crate::sentiment::{normalize, RawScoreSet, SentimentScoreSet};

/// Wire shape of an inbound tweet record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundTweetEvent {
    pub tweet64: String,
    pub timestamp: String,
}

/// Result of an event that reached DONE.
#[derive(Debug)]
pub struct ProcessOutcome {
    pub bucket_ms: i64,
    pub scores: SentimentScoreSet,
    pub published: usize,
    pub failures: Vec<PublishError>,
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub zone: ProcessingZone,
    pub classify_timeout: Duration,
    pub publish_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            zone: ProcessingZone::Utc,
            classify_timeout: Duration::from_secs(10),
            publish_timeout: Duration::from_secs(5),
        }
    }
}

/// Stateless between events; clone freely across worker tasks.
#[derive(Clone)]
pub struct TweetPipeline {
    classifier: DynClassifier,
    publisher: FanoutPublisher,
    settings: PipelineSettings,
}

impl TweetPipeline {
    pub fn new(classifier: DynClassifier, sink: DynSink, settings: PipelineSettings) -> Self {
        Self {
            classifier,
            publisher: FanoutPublisher::new(sink, settings.publish_timeout),
            settings,
        }
    }

    pub fn zone(&self) -> ProcessingZone {
        self.settings.zone
    }

    pub async fn process(&self, event: InboundTweetEvent) -> Result<ProcessOutcome, PipelineError> {
        let res = self.run(event).await;
        match &res {
            Ok(_) => counter!("tweets_processed_total").increment(1),
            Err(e) => counter!("tweets_failed_total", "stage" => e.stage()).increment(1),
        }
        res
    }

    async fn run(&self, event: InboundTweetEvent) -> Result<ProcessOutcome, PipelineError> {
        let text = decode_tweet(&event.tweet64)?;
        tracing::debug!(%text, "decoded tweet");

        let bucket_ms = derive_hour_bucket(&event.timestamp, &self.settings.zone)?;

        let raw = self.classify(&text).await?;
        tracing::debug!(?raw, "classifier result");

        let scores = normalize(&raw);

        let report = self.publisher.publish(bucket_ms, &scores).await;
        let published = report.sent.len();
        if !report.is_complete() {
            tracing::warn!(
                bucket_ms,
                published,
                failed = report.failures.len(),
                "fan-out incomplete"
            );
        }

        Ok(ProcessOutcome {
            bucket_ms,
            scores,
            published,
            failures: report.failures,
        })
    }

    async fn classify(&self, text: &str) -> Result<RawScoreSet, ClassifierError> {
        let t0 = Instant::now();
        let timeout = self.settings.classify_timeout;
        let res = match tokio::time::timeout(timeout, self.classifier.classify(text)).await {
            Ok(r) => r,
            Err(_) => Err(ClassifierError::Timeout(timeout.as_millis() as u64)),
        };
        histogram!("classifier_duration_ms", "provider" => self.classifier.provider_name())
            .record(t0.elapsed().as_secs_f64() * 1_000.0);
        tracing::info!(
            provider = self.classifier.provider_name(),
            text_len = text.len(),
            ok = res.is_ok(),
            "classify"
        );
        res
    }
}
