//! Tweet Sentiment Worker: binary entrypoint.
//! Loads config, wires classifier + sink into the pipeline, and runs the
//! configured source. The HTTP server always serves `/health` and `/metrics`.

use anyhow::Context;
use tokio::io::BufReader;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tweet_sentiment_worker::api::{self, AppState};
use tweet_sentiment_worker::config::{load_config_default, SourceKind};
use tweet_sentiment_worker::ingest::{run_worker, run_worker_until, ChannelSource, JsonLinesSource};
use tweet_sentiment_worker::metrics::Metrics;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tweet_sentiment_worker=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = load_config_default().context("loading worker config")?;
    let metrics = Metrics::init()?;
    let pipeline = tweet_sentiment_worker::build_pipeline(&cfg)?;

    let (ingest, channel_source) = match cfg.source {
        SourceKind::Http => {
            let (tx, src) = ChannelSource::channel(cfg.max_in_flight.saturating_mul(4));
            (Some(tx), Some(src))
        }
        SourceKind::Stdin => (None, None),
    };

    let state = AppState {
        ingest,
        metrics: Some(metrics.handle.clone()),
    };
    let listener = tokio::net::TcpListener::bind(&cfg.http_bind)
        .await
        .with_context(|| format!("binding {}", cfg.http_bind))?;
    tracing::info!(addr = %cfg.http_bind, source = ?cfg.source, "http listening");

    // Dropping the router (and its ingest sender) on shutdown closes the channel source.
    let server = tokio::spawn(async move {
        axum::serve(listener, api::router(state))
            .with_graceful_shutdown(shutdown_signal())
            .await
    });

    let stats = match channel_source {
        Some(src) => run_worker(src, pipeline, cfg.max_in_flight).await,
        None => {
            let src = JsonLinesSource::new(BufReader::new(tokio::io::stdin()));
            run_worker_until(src, pipeline, cfg.max_in_flight, shutdown_signal()).await
        }
    };
    tracing::info!(?stats, "worker exited");

    server.abort();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
}
