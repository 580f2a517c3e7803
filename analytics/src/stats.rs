use crate::sentiment::{categorize, parse_sentiment, NEUTRAL_SCORE};
use disaster_core::{ClassificationRecord, SentimentCategory};
use serde::Serialize;

/// Raw per-category record counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentimentCounts {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

impl SentimentCounts {
    pub fn add(&mut self, category: SentimentCategory) {
        match category {
            SentimentCategory::Positive => self.positive += 1,
            SentimentCategory::Neutral => self.neutral += 1,
            SentimentCategory::Negative => self.negative += 1,
        }
    }

    pub fn get(&self, category: SentimentCategory) -> usize {
        match category {
            SentimentCategory::Positive => self.positive,
            SentimentCategory::Neutral => self.neutral,
            SentimentCategory::Negative => self.negative,
        }
    }

    pub fn total(&self) -> usize {
        self.positive + self.neutral + self.negative
    }

    /// Rounded percentages of the total. Each bucket is rounded on its own,
    /// so the sum may land on 99 or 101.
    pub fn percentages(&self) -> SentimentBreakdown {
        let total = self.total();
        if total == 0 {
            return SentimentBreakdown::default();
        }
        let pct = |count: usize| ((count as f64 / total as f64) * 100.0).round() as u32;
        SentimentBreakdown {
            positive: pct(self.positive),
            neutral: pct(self.neutral),
            negative: pct(self.negative),
        }
    }
}

/// Integer percentages per sentiment category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentimentBreakdown {
    pub positive: u32,
    pub neutral: u32,
    pub negative: u32,
}

impl SentimentBreakdown {
    pub fn sum(&self) -> u32 {
        self.positive + self.neutral + self.negative
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SentimentStats {
    /// Unrounded mean of per-record scores.
    pub score: f64,
    pub breakdown: SentimentBreakdown,
}

impl Default for SentimentStats {
    fn default() -> Self {
        Self {
            score: NEUTRAL_SCORE,
            breakdown: SentimentBreakdown::default(),
        }
    }
}

pub fn sentiment_counts(records: &[ClassificationRecord]) -> SentimentCounts {
    let mut counts = SentimentCounts::default();
    for record in records {
        counts.add(categorize(parse_sentiment(record)));
    }
    counts
}

/// Mean score and category percentages over all records.
pub fn sentiment_stats(records: &[ClassificationRecord]) -> SentimentStats {
    if records.is_empty() {
        return SentimentStats::default();
    }

    let mut counts = SentimentCounts::default();
    let mut total_score = 0.0;
    for record in records {
        let score = parse_sentiment(record);
        total_score += score;
        counts.add(categorize(score));
    }

    SentimentStats {
        score: total_score / records.len() as f64,
        breakdown: counts.percentages(),
    }
}
