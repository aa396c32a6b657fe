// src/ingest/mod.rs
//! Inbound half of the stream adapter plus the worker loop that drives the
//! pipeline. Each event gets its own task; a semaphore caps how many run at
//! once. No ordering between events.

pub mod source;

use std::future::Future;
use std::sync::Arc;

use metrics::{counter, gauge};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

use crate::error::PipelineError;
use crate::metrics::ensure_metrics_described;
use crate::pipeline::{ProcessOutcome, TweetPipeline};

pub use source::{ChannelSource, JsonLinesSource, TweetSource};

/// Totals for one worker run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub received: u64,
    pub processed: u64,
    pub failed: u64,
    pub malformed: u64,
    pub publish_failures: u64,
}

impl WorkerStats {
    fn record(&mut self, done: Result<Result<ProcessOutcome, PipelineError>, JoinError>) {
        match done {
            Ok(Ok(outcome)) => {
                self.processed += 1;
                self.publish_failures += outcome.failures.len() as u64;
                tracing::info!(
                    bucket_ms = outcome.bucket_ms,
                    published = outcome.published,
                    "tweet processed"
                );
            }
            Ok(Err(e)) => {
                self.failed += 1;
                tracing::warn!(stage = e.stage(), error = %e, "tweet dropped");
            }
            Err(e) => {
                self.failed += 1;
                tracing::error!(error = %e, "pipeline task aborted");
            }
        }
    }
}

/// Pull events from `source` until it is exhausted, processing up to
/// `max_in_flight` concurrently. Returns once every spawned event finished.
pub async fn run_worker<S: TweetSource>(
    source: S,
    pipeline: TweetPipeline,
    max_in_flight: usize,
) -> WorkerStats {
    run_worker_until(source, pipeline, max_in_flight, std::future::pending()).await
}

/// Like [`run_worker`], but stops pulling as soon as `shutdown` resolves.
/// Events already spawned still run to completion, publishes included.
pub async fn run_worker_until<S, F>(
    mut source: S,
    pipeline: TweetPipeline,
    max_in_flight: usize,
    shutdown: F,
) -> WorkerStats
where
    S: TweetSource,
    F: Future<Output = ()>,
{
    ensure_metrics_described();
    tokio::pin!(shutdown);

    let permits = Arc::new(Semaphore::new(max_in_flight.max(1)));
    let mut tasks = JoinSet::new();
    let mut stats = WorkerStats::default();

    tracing::info!(source = source.name(), max_in_flight, zone = %pipeline.zone(), "worker started");

    loop {
        let item = tokio::select! {
            biased;
            _ = &mut shutdown => {
                tracing::info!(in_flight = tasks.len(), "shutdown requested, draining");
                break;
            }
            item = source.next_event() => item,
        };
        let Some(item) = item else { break };
        let event = match item {
            Ok(ev) => ev,
            Err(e) => {
                stats.malformed += 1;
                counter!("tweets_malformed_total").increment(1);
                tracing::warn!(error = %e, "skipping inbound record");
                continue;
            }
        };
        stats.received += 1;
        counter!("tweets_received_total").increment(1);

        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        let p = pipeline.clone();
        tasks.spawn(async move {
            let _permit = permit;
            gauge!("worker_in_flight").increment(1.0);
            let res = p.process(event).await;
            gauge!("worker_in_flight").decrement(1.0);
            res
        });

        while let Some(done) = tasks.try_join_next() {
            stats.record(done);
        }
    }

    while let Some(done) = tasks.join_next().await {
        stats.record(done);
    }

    tracing::info!(?stats, "worker finished");
    stats
}
