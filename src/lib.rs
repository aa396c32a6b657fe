// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod bucket;
pub mod classifier;
pub mod codec;
pub mod config;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod pipeline;
pub mod publish;
pub mod sentiment;

// ---- Re-exports for stable public API ----
pub use crate::bucket::{derive_hour_bucket, ProcessingZone};
pub use crate::codec::{decode_tweet, encode_tweet};
pub use crate::error::{ClassifierError, DecodeError, ParseError, PipelineError, PublishError};
pub use crate::pipeline::{InboundTweetEvent, PipelineSettings, ProcessOutcome, TweetPipeline};
pub use crate::sentiment::{normalize, Dimension, RawScoreSet, SentimentScoreSet};

use std::sync::Arc;
use std::time::Duration;

use crate::classifier::build_classifier_from_config;
use crate::config::{SinkKind, WorkerConfig};
use crate::publish::{DynSink, HttpSink, LogSink};

/// Composition root: build the pipeline and its collaborators from config.
pub fn build_pipeline(cfg: &WorkerConfig) -> anyhow::Result<TweetPipeline> {
    let settings = PipelineSettings {
        zone: cfg.zone()?,
        classify_timeout: Duration::from_millis(cfg.classify_timeout_ms),
        publish_timeout: Duration::from_millis(cfg.publish_timeout_ms),
    };
    let classifier = build_classifier_from_config(&cfg.classifier, settings.classify_timeout)?;

    let sink: DynSink = match cfg.sink {
        SinkKind::Log => Arc::new(LogSink),
        SinkKind::Http => {
            let endpoint = cfg
                .sink_endpoint
                .clone()
                .ok_or_else(|| anyhow::anyhow!("sink_endpoint missing"))?;
            Arc::new(HttpSink::new(endpoint).with_timeout(settings.publish_timeout))
        }
    };

    tracing::info!(
        classifier = classifier.provider_name(),
        sink = sink.name(),
        zone = %settings.zone,
        "pipeline assembled"
    );
    Ok(TweetPipeline::new(classifier, sink, settings))
}
