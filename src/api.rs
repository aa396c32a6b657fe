//! HTTP surface: tweet ingest plus health and metrics endpoints.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::pipeline::InboundTweetEvent;

#[derive(Clone, Default)]
pub struct AppState {
    /// Feeds the worker when the HTTP source is active.
    pub ingest: Option<mpsc::Sender<InboundTweetEvent>>,
    pub metrics: Option<PrometheusHandle>,
}

/// `/tweets` is mounted only when there is a worker channel to feed.
pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/metrics", get(render_metrics));
    if let Some(tx) = state.ingest.clone() {
        let ingest = Router::new()
            .route("/tweets", post(ingest_tweet))
            .with_state::<AppState>(tx);
        app = app.merge(ingest);
    }
    app.with_state(state)
}

async fn render_metrics(State(state): State<AppState>) -> Response {
    match state.metrics {
        Some(h) => h.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}

/// Accepts one tweet record and queues it. Processing is asynchronous, so
/// pipeline failures are never reported back here.
async fn ingest_tweet(
    State(tx): State<mpsc::Sender<InboundTweetEvent>>,
    payload: Result<Json<InboundTweetEvent>, JsonRejection>,
) -> Response {
    let Json(event) = match payload {
        Ok(p) => p,
        Err(rej) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": rej.body_text() })),
            )
                .into_response()
        }
    };

    match tx.try_send(event) {
        Ok(()) => (StatusCode::ACCEPTED, Json(json!({ "queued": true }))).into_response(),
        Err(TrySendError::Full(_)) => {
            tracing::warn!("ingest backlog full, rejecting tweet");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": "backlog full" })),
            )
                .into_response()
        }
        Err(TrySendError::Closed(_)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "worker stopped" })),
        )
            .into_response(),
    }
}
