//! Sentiment score types and the [0,1] → [0,100] normalizer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the four score axes. `as_str` is the literal used in outbound keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Mixed,
    Negative,
    Neutral,
    Positive,
}

impl Dimension {
    /// Fan-out order.
    pub const ALL: [Dimension; 4] = [
        Dimension::Mixed,
        Dimension::Negative,
        Dimension::Neutral,
        Dimension::Positive,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Mixed => "Mixed",
            Dimension::Negative => "Negative",
            Dimension::Neutral => "Neutral",
            Dimension::Positive => "Positive",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidences as returned by the classifier, each in [0,1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawScoreSet {
    pub mixed: f64,
    pub negative: f64,
    pub neutral: f64,
    pub positive: f64,
    /// Overall label (e.g. "POSITIVE"); logged, never published.
    #[serde(default)]
    pub label: Option<String>,
}

impl RawScoreSet {
    pub fn new(mixed: f64, negative: f64, neutral: f64, positive: f64) -> Self {
        Self {
            mixed,
            negative,
            neutral,
            positive,
            label: None,
        }
    }

    /// True when every confidence is a finite value in [0,1].
    pub fn is_valid(&self) -> bool {
        [self.mixed, self.negative, self.neutral, self.positive]
            .iter()
            .all(|v| v.is_finite() && (0.0..=1.0).contains(v))
    }
}

/// Percent scores in [0,100] with at most three fractional digits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentScoreSet {
    pub mixed: f64,
    pub negative: f64,
    pub neutral: f64,
    pub positive: f64,
}

impl SentimentScoreSet {
    pub fn get(&self, dim: Dimension) -> f64 {
        match dim {
            Dimension::Mixed => self.mixed,
            Dimension::Negative => self.negative,
            Dimension::Neutral => self.neutral,
            Dimension::Positive => self.positive,
        }
    }

    /// `(dimension, score)` pairs in fan-out order.
    pub fn iter(&self) -> impl Iterator<Item = (Dimension, f64)> + '_ {
        Dimension::ALL.into_iter().map(move |d| (d, self.get(d)))
    }
}

/// Scale each confidence to a percentage and round to 3 decimals.
pub fn normalize(raw: &RawScoreSet) -> SentimentScoreSet {
    SentimentScoreSet {
        mixed: to_percent(raw.mixed),
        negative: to_percent(raw.negative),
        neutral: to_percent(raw.neutral),
        positive: to_percent(raw.positive),
    }
}

fn to_percent(confidence: f64) -> f64 {
    round3(confidence * 100.0)
}

/// Round to 3 decimal places, ties to even (banker's rounding).
pub fn round3(x: f64) -> f64 {
    (x * 1000.0).round_ties_even() / 1000.0
}
