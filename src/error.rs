//! Error types for each pipeline stage.
//!
//! Stage errors abort a single event; `PublishError` is per dimension and
//! never aborts the remaining publishes of the same event.

use thiserror::Error;

use crate::sentiment::Dimension;

/// The tweet body could not be turned back into text.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("decoded payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// The source timestamp did not match `"%a %b %d %H:%M:%S %z %Y"`.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("timestamp {0:?} does not follow the `Www Mmm dd HH:mm:ss +hhmm yyyy` layout")]
    Layout(String),

    #[error("malformed timestamp {input:?}: {source}")]
    Format {
        input: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("timestamp {0:?} does not map to an instant in the processing zone")]
    Unrepresentable(String),
}

/// Failure talking to the classification service.
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("classification service unavailable: {0}")]
    Unavailable(String),

    #[error("classification service throttled the request")]
    Throttled,

    #[error("classification request rejected: {0}")]
    Rejected(String),

    #[error("invalid classification response: {0}")]
    InvalidResponse(String),

    #[error("classification timed out after {0} ms")]
    Timeout(u64),
}

/// Failure handing one message to the outbound transport.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("sink returned status {0}")]
    Status(u16),

    #[error("send timed out after {0} ms")]
    Timeout(u64),
}

/// One failed dimension of a fan-out.
#[derive(Error, Debug)]
#[error("publish of {key} ({dimension}) failed: {source}")]
pub struct PublishError {
    pub dimension: Dimension,
    pub key: String,
    #[source]
    pub source: SinkError,
}

/// Reasons an event terminates in FAILED.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}

impl PipelineError {
    /// Stage label used in logs and the `tweets_failed_total` metric.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Decode(_) => "decode",
            PipelineError::Parse(_) => "parse",
            PipelineError::Classifier(_) => "classify",
        }
    }
}

/// Inbound record that could not be read off the wire.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("malformed inbound record: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("source read failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid processing zone {0:?} (expected \"UTC\", \"local\" or an offset like \"+02:00\")")]
    Zone(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
