use anyhow::Context;
use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Call once per process.
    pub fn init() -> anyhow::Result<Self> {
        // Use default buckets to avoid API differences across crate versions.
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_metrics_described();
        Ok(Self { handle })
    }
}

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("tweets_received_total", "Inbound tweet events accepted by the worker.");
        describe_counter!(
            "tweets_processed_total",
            "Events that reached DONE (all four publishes attempted)."
        );
        describe_counter!(
            "tweets_failed_total",
            "Events dropped, labelled by failing stage."
        );
        describe_counter!(
            "tweets_malformed_total",
            "Inbound records that could not be deserialized."
        );
        describe_counter!(
            "sentiment_messages_published_total",
            "Outbound score messages accepted by the sink."
        );
        describe_counter!(
            "sentiment_publish_errors_total",
            "Outbound score messages the sink refused."
        );
        describe_histogram!(
            "classifier_duration_ms",
            Unit::Milliseconds,
            "Classification call latency."
        );
        describe_gauge!("worker_in_flight", "Events currently being processed.");
    });
}
