// tests/http_adapters.rs
//
// reqwest-based classifier and sink against a throwaway local axum server.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};

use tweet_sentiment_worker::classifier::{HttpClassifier, SentimentClassifier};
use tweet_sentiment_worker::error::SinkError;
use tweet_sentiment_worker::publish::{HttpSink, MessageSink, OutboundSentimentMessage};
use tweet_sentiment_worker::{ClassifierError, Dimension};

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[derive(Clone, Default)]
struct Seen(Arc<Mutex<Vec<Value>>>);

async fn detect(State(seen): State<Seen>, Json(req): Json<Value>) -> (StatusCode, Json<Value>) {
    seen.0.lock().unwrap().push(req.clone());
    let text = req["Text"].as_str().unwrap_or_default();
    if text.contains("throttle") {
        return (StatusCode::TOO_MANY_REQUESTS, Json(json!({})));
    }
    if text.contains("weird") {
        return (
            StatusCode::OK,
            Json(json!({"SentimentScore": {"Mixed": 2.0, "Negative": 0.0, "Neutral": 0.0, "Positive": 0.0}})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "Sentiment": "POSITIVE",
            "SentimentScore": {"Mixed": 0.001, "Negative": 0.01, "Neutral": 0.05, "Positive": 0.94}
        })),
    )
}

#[tokio::test]
async fn http_classifier_round_trip_and_error_mapping() {
    let seen = Seen::default();
    let base = serve(
        Router::new()
            .route("/detect", post(detect))
            .with_state(seen.clone()),
    )
    .await;

    let c = HttpClassifier::new(
        format!("{base}/detect"),
        Some("k".into()),
        Duration::from_secs(5),
    )
    .unwrap();

    let raw = c.classify("I love this").await.unwrap();
    assert_eq!(raw.positive, 0.94);
    assert_eq!(raw.label.as_deref(), Some("POSITIVE"));
    {
        let reqs = seen.0.lock().unwrap();
        assert_eq!(reqs[0]["LanguageCode"], "en");
        assert_eq!(reqs[0]["Text"], "I love this");
    }

    assert!(matches!(
        c.classify("please throttle me").await,
        Err(ClassifierError::Throttled)
    ));
    assert!(matches!(
        c.classify("weird scores").await,
        Err(ClassifierError::InvalidResponse(_))
    ));
}

#[tokio::test]
async fn http_classifier_unreachable_is_unavailable() {
    // Bind then drop to get a port nobody listens on.
    let port = {
        let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        l.local_addr().unwrap().port()
    };
    let c = HttpClassifier::new(
        format!("http://127.0.0.1:{port}/detect"),
        None,
        Duration::from_secs(2),
    )
    .unwrap();
    assert!(matches!(
        c.classify("hello").await,
        Err(ClassifierError::Unavailable(_))
    ));
}

#[derive(Clone, Default)]
struct Received(Arc<Mutex<Vec<(String, String, String)>>>);

async fn publish(State(rec): State<Received>, headers: HeaderMap, body: String) -> StatusCode {
    let key = headers
        .get("x-message-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let ct = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let refuse = key.ends_with("-Neutral");
    rec.0.lock().unwrap().push((key, ct, body));
    if refuse {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::NO_CONTENT
    }
}

#[tokio::test]
async fn http_sink_sends_key_header_and_scalar_body() {
    let rec = Received::default();
    let base = serve(
        Router::new()
            .route("/publish", post(publish))
            .with_state(rec.clone()),
    )
    .await;
    let sink = HttpSink::new(format!("{base}/publish"));

    sink.send(OutboundSentimentMessage::new(1_539_201_600_000, Dimension::Positive, 94.0))
        .await
        .unwrap();
    let err = sink
        .send(OutboundSentimentMessage::new(1_539_201_600_000, Dimension::Neutral, 5.0))
        .await
        .unwrap_err();
    assert!(matches!(err, SinkError::Status(503)));

    let got = rec.0.lock().unwrap().clone();
    assert_eq!(
        got[0],
        (
            "1539201600000-Positive".to_string(),
            "application/json".to_string(),
            "94.0".to_string()
        )
    );
    assert_eq!(got.len(), 2);
}
