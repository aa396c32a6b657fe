// tests/api_http.rs
//
// HTTP-level tests for the Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - GET /metrics
// - POST /tweets (queued, malformed, not mounted, backlog full)

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value as Json;
use tokio::sync::mpsc;
use tower::ServiceExt as _; // for `oneshot`

use tweet_sentiment_worker::api::{self, AppState};
use tweet_sentiment_worker::metrics::Metrics;
use tweet_sentiment_worker::InboundTweetEvent;

const BODY_LIMIT: usize = 1024 * 1024;

fn tweet_body() -> String {
    r#"{"tweet64":"SSBsb3ZlIHRoaXM=","timestamp":"Wed Oct 10 20:19:24 +0000 2018"}"#.to_string()
}

fn post_tweet(body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/tweets")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .expect("build POST /tweets")
}

async fn body_json(resp: axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

fn with_channel(cap: usize) -> (Router, mpsc::Receiver<InboundTweetEvent>) {
    let (tx, rx) = mpsc::channel(cap);
    let app = api::router(AppState {
        ingest: Some(tx),
        metrics: None,
    });
    (app, rx)
}

#[tokio::test]
async fn health_returns_ok() {
    let app = api::router(AppState::default());
    let resp = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(&bytes[..], b"OK");
}

#[tokio::test]
async fn tweet_is_queued_for_the_worker() {
    let (app, mut rx) = with_channel(4);
    let resp = app.oneshot(post_tweet(tweet_body())).await.unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    assert_eq!(body_json(resp).await["queued"], true);

    let ev = rx.recv().await.expect("event forwarded");
    assert_eq!(ev.tweet64, "SSBsb3ZlIHRoaXM=");
    assert_eq!(ev.timestamp, "Wed Oct 10 20:19:24 +0000 2018");
}

#[tokio::test]
async fn malformed_json_is_rejected_with_400() {
    let (app, mut rx) = with_channel(4);
    for bad in ["{not json", r#"{"tweet64":"SGk="}"#] {
        let resp = app.clone().oneshot(post_tweet(bad.to_string())).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body {bad:?}");
        assert!(body_json(resp).await.get("error").is_some());
    }
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn tweets_route_absent_without_channel() {
    let app = api::router(AppState::default());
    let resp = app.oneshot(post_tweet(tweet_body())).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn full_backlog_returns_503() {
    let (app, _rx) = with_channel(1);
    let first = app.clone().oneshot(post_tweet(tweet_body())).await.unwrap();
    assert_eq!(first.status(), StatusCode::ACCEPTED);
    let second = app.oneshot(post_tweet(tweet_body())).await.unwrap();
    assert_eq!(second.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(second).await["error"], "backlog full");
}

#[tokio::test]
async fn metrics_endpoint_renders_described_series() {
    // Only test in this binary that installs the global recorder.
    let m = Metrics::init().expect("install recorder");
    metrics::counter!("tweets_received_total").increment(1);

    let app = api::router(AppState {
        ingest: None,
        metrics: Some(m.handle.clone()),
    });
    let resp = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(
        text.contains("tweets_received_total"),
        "metrics exposition missing counter\n{text}"
    );
}
