//! Per-record sentiment scoring.
//!
//! Scores live on a 0–100 scale. A missing or unparseable value counts as
//! neutral (50) so that every record contributes to the aggregates.

use disaster_core::{ClassificationRecord, SentimentCategory, SentimentValue};
use once_cell::sync::Lazy;
use regex::Regex;

pub const NEUTRAL_SCORE: f64 = 50.0;
pub const POSITIVE_THRESHOLD: f64 = 60.0;
pub const NEUTRAL_THRESHOLD: f64 = 40.0;

static NUMERIC_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?")
        .expect("numeric prefix pattern is valid")
});

/// Parses the longest leading decimal literal of `raw`, ignoring leading
/// whitespace. `"72abc"` yields 72; `"abc"` yields `None`.
pub fn parse_numeric_prefix(raw: &str) -> Option<f64> {
    let trimmed = raw.trim_start();
    for (prefix, value) in [
        ("Infinity", f64::INFINITY),
        ("+Infinity", f64::INFINITY),
        ("-Infinity", f64::NEG_INFINITY),
    ] {
        if trimmed.starts_with(prefix) {
            return Some(value);
        }
    }
    NUMERIC_PREFIX_RE
        .find(trimmed)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Numeric score of a raw sentiment column.
pub fn score_value(value: Option<&SentimentValue>) -> f64 {
    match value {
        Some(SentimentValue::Number(n)) => *n,
        Some(SentimentValue::Text(text)) => parse_numeric_prefix(text).unwrap_or(NEUTRAL_SCORE),
        Some(SentimentValue::Other(_)) | None => NEUTRAL_SCORE,
    }
}

pub fn parse_sentiment(record: &ClassificationRecord) -> f64 {
    score_value(record.sentiment.as_ref())
}

/// Three-way partition. Boundaries are inclusive on the lower edge, so 60 is
/// positive and 40 is neutral. NaN fails both comparisons and lands in
/// negative.
pub fn categorize(score: f64) -> SentimentCategory {
    if score >= POSITIVE_THRESHOLD {
        SentimentCategory::Positive
    } else if score >= NEUTRAL_THRESHOLD {
        SentimentCategory::Neutral
    } else {
        SentimentCategory::Negative
    }
}

/// Five-level description shown next to the aggregate score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SentimentLevel {
    VeryPositive,
    Positive,
    Neutral,
    Negative,
    VeryNegative,
}

impl SentimentLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            SentimentLevel::VeryPositive
        } else if score >= POSITIVE_THRESHOLD {
            SentimentLevel::Positive
        } else if score >= NEUTRAL_THRESHOLD {
            SentimentLevel::Neutral
        } else if score >= 20.0 {
            SentimentLevel::Negative
        } else {
            SentimentLevel::VeryNegative
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SentimentLevel::VeryPositive => "Very Positive",
            SentimentLevel::Positive => "Positive",
            SentimentLevel::Neutral => "Neutral",
            SentimentLevel::Negative => "Negative",
            SentimentLevel::VeryNegative => "Very Negative",
        }
    }
}

/// Three-way label for an optional score; absent scores read as neutral.
pub fn sentiment_label(score: Option<f64>) -> &'static str {
    score.map_or(SentimentCategory::Neutral, categorize).label()
}
