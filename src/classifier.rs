//! Classifier adapter: provider abstraction over the external sentiment service.
//! The language code is fixed to `en`; no language detection and no retries.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{ClassifierConfig, ClassifierProvider};
use crate::error::{ClassifierError, ConfigError};
use crate::sentiment::RawScoreSet;

pub const LANGUAGE_CODE: &str = "en";

/// Largest text (UTF-8 bytes) the service accepts.
pub const MAX_TEXT_BYTES: usize = 5000;

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    /// Score `text`, returning four confidences in [0,1].
    async fn classify(&self, text: &str) -> Result<RawScoreSet, ClassifierError>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynClassifier = Arc<dyn SentimentClassifier>;

/// Input the service would reject anyway; refused locally to save the call.
pub fn check_text(text: &str) -> Result<(), ClassifierError> {
    if text.trim().is_empty() {
        return Err(ClassifierError::Rejected("empty text".into()));
    }
    if text.len() > MAX_TEXT_BYTES {
        return Err(ClassifierError::Rejected(format!(
            "text is {} bytes, limit is {MAX_TEXT_BYTES}",
            text.len()
        )));
    }
    Ok(())
}

/// Factory: build a classifier according to config and environment.
///
/// * If `CLASSIFIER_TEST_MODE=mock`, returns a deterministic mock.
/// * Else builds the configured provider.
pub fn build_classifier_from_config(
    config: &ClassifierConfig,
    timeout: Duration,
) -> Result<DynClassifier, ConfigError> {
    if std::env::var("CLASSIFIER_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Ok(Arc::new(MockClassifier::default()));
    }

    match config.provider {
        ClassifierProvider::Mock => Ok(Arc::new(MockClassifier::default())),
        ClassifierProvider::Http => {
            let endpoint = config
                .endpoint
                .clone()
                .ok_or_else(|| ConfigError::Invalid("classifier endpoint missing".into()))?;
            let client = HttpClassifier::new(endpoint, config.api_key.clone(), timeout)?;
            Ok(Arc::new(client))
        }
    }
}

// ------------------------------------------------------------
// HTTP provider
// ------------------------------------------------------------

/// Talks to a DetectSentiment-style JSON endpoint.
pub struct HttpClassifier {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DetectSentimentRequest<'a> {
    text: &'a str,
    language_code: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DetectSentimentResponse {
    #[serde(default)]
    sentiment: Option<String>,
    sentiment_score: SentimentScore,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SentimentScore {
    mixed: f64,
    negative: f64,
    neutral: f64,
    positive: f64,
}

impl HttpClassifier {
    pub fn new(
        endpoint: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("tweet-sentiment-worker/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::Invalid(format!("http client: {e}")))?;
        Ok(Self {
            http,
            endpoint,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            timeout,
        })
    }
}

#[async_trait]
impl SentimentClassifier for HttpClassifier {
    async fn classify(&self, text: &str) -> Result<RawScoreSet, ClassifierError> {
        check_text(text)?;

        let req = DetectSentimentRequest {
            text,
            language_code: LANGUAGE_CODE,
        };
        let mut builder = self.http.post(&self.endpoint).json(&req);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let resp = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ClassifierError::Timeout(self.timeout.as_millis() as u64)
            } else {
                ClassifierError::Unavailable(e.to_string())
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(map_status(status.as_u16(), &body));
        }

        let body: DetectSentimentResponse = resp
            .json()
            .await
            .map_err(|e| ClassifierError::InvalidResponse(e.to_string()))?;
        let raw = RawScoreSet {
            mixed: body.sentiment_score.mixed,
            negative: body.sentiment_score.negative,
            neutral: body.sentiment_score.neutral,
            positive: body.sentiment_score.positive,
            label: body.sentiment,
        };
        if !raw.is_valid() {
            return Err(ClassifierError::InvalidResponse(format!(
                "scores outside [0,1]: {raw:?}"
            )));
        }
        Ok(raw)
    }

    fn provider_name(&self) -> &'static str {
        "http"
    }
}

fn map_status(status: u16, body: &str) -> ClassifierError {
    let snippet: String = body.chars().take(200).collect();
    match status {
        429 => ClassifierError::Throttled,
        400 if body.contains("ThrottlingException") => ClassifierError::Throttled,
        500..=599 => ClassifierError::Unavailable(format!("status {status}: {snippet}")),
        _ => ClassifierError::Rejected(format!("status {status}: {snippet}")),
    }
}

// ------------------------------------------------------------
// Mock provider
// ------------------------------------------------------------

/// Returns fixed scores and counts calls; for tests and local runs.
pub struct MockClassifier {
    pub fixed: RawScoreSet,
    calls: AtomicUsize,
}

impl MockClassifier {
    pub fn new(fixed: RawScoreSet) -> Self {
        Self {
            fixed,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockClassifier {
    fn default() -> Self {
        Self::new(RawScoreSet {
            label: Some("NEUTRAL".into()),
            ..RawScoreSet::new(0.05, 0.15, 0.6, 0.2)
        })
    }
}

#[async_trait]
impl SentimentClassifier for MockClassifier {
    async fn classify(&self, text: &str) -> Result<RawScoreSet, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        check_text(text)?;
        Ok(self.fixed.clone())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}
