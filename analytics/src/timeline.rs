//! Per-day sentiment series joined from classifications and post timestamps.

use crate::sentiment::{categorize, parse_sentiment};
use crate::stats::SentimentCounts;
use disaster_core::{ClassificationRecord, PostRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const DEFAULT_TREND_WINDOW: usize = 10;
const TREND_THRESHOLD: f64 = 2.0;

static ISO_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("iso date pattern is valid"));

static EMBEDDED_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})-(\d{2})-(\d{2})").expect("embedded date pattern is valid"));

/// Post id → raw timestamp.
#[derive(Debug, Clone, Default)]
pub struct PostTimeIndex {
    times: HashMap<String, String>,
}

impl PostTimeIndex {
    /// Later posts win when ids repeat.
    pub fn from_posts(posts: &[PostRecord]) -> Self {
        let mut index = Self::default();
        for post in posts {
            index.insert(&post.post_id, &post.timestamp);
        }
        index
    }

    pub fn insert(&mut self, post_id: &str, timestamp: &str) {
        self.times.insert(post_id.to_string(), timestamp.to_string());
    }

    pub fn get(&self, post_id: &str) -> Option<&str> {
        self.times.get(post_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// Calendar day (`YYYY-MM-DD`) a timestamp falls into.
///
/// ISO timestamps use the part before `T`. Anything else, such as
/// `2025-04-19_14-49-23`, falls back to the first embedded date. Timestamps
/// with no recognisable date yield `None`.
pub fn resolve_bucket_date(raw: &str) -> Option<String> {
    let head = raw.split('T').next().unwrap_or_default();
    if ISO_DATE_RE.is_match(head) {
        return Some(head.to_string());
    }
    EMBEDDED_DATE_RE
        .captures(raw)
        .map(|caps| format!("{}-{}-{}", &caps[1], &caps[2], &caps[3]))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySentiment {
    pub date: String,
    pub positive: u32,
    pub neutral: u32,
    pub negative: u32,
    /// Unrounded mean score for the day.
    pub overall: f64,
}

#[derive(Default)]
struct DayBucket {
    counts: SentimentCounts,
    total_score: f64,
}

/// Buckets records by the day of their post, ascending by date.
///
/// Records whose post is not in `index`, or whose timestamp has no date,
/// are left out.
pub fn per_day_sentiment(
    records: &[ClassificationRecord],
    index: &PostTimeIndex,
) -> Vec<DailySentiment> {
    let mut days: BTreeMap<String, DayBucket> = BTreeMap::new();

    for record in records {
        let Some(date) = index.get(&record.post_id).and_then(resolve_bucket_date) else {
            continue;
        };
        let score = parse_sentiment(record);
        let bucket = days.entry(date).or_default();
        bucket.total_score += score;
        bucket.counts.add(categorize(score));
    }

    days.into_iter()
        .map(|(date, bucket)| {
            let breakdown = bucket.counts.percentages();
            DailySentiment {
                date,
                positive: breakdown.positive,
                neutral: breakdown.neutral,
                negative: breakdown.negative,
                overall: bucket.total_score / bucket.counts.total() as f64,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentTrend {
    Up,
    Down,
    Stable,
}

impl SentimentTrend {
    pub fn symbol(self) -> &'static str {
        match self {
            SentimentTrend::Up => "↑",
            SentimentTrend::Down => "↓",
            SentimentTrend::Stable => "→",
        }
    }
}

/// Compares the mean score of the last `window` records with the `window`
/// before them. A shift of more than two points is a trend.
pub fn sentiment_trend(records: &[ClassificationRecord], window: usize) -> SentimentTrend {
    let needed = match window.checked_mul(2) {
        Some(needed) if window > 0 => needed,
        _ => return SentimentTrend::Stable,
    };
    if records.len() < needed {
        return SentimentTrend::Stable;
    }

    let mean = |slice: &[ClassificationRecord]| {
        slice.iter().map(parse_sentiment).sum::<f64>() / slice.len() as f64
    };
    let split = records.len() - window;
    let recent = mean(&records[split..]);
    let previous = mean(&records[split - window..split]);
    let delta = recent - previous;

    if delta > TREND_THRESHOLD {
        SentimentTrend::Up
    } else if delta < -TREND_THRESHOLD {
        SentimentTrend::Down
    } else {
        SentimentTrend::Stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use disaster_core::SentimentValue;

    fn scored(id: &str, score: f64) -> ClassificationRecord {
        ClassificationRecord::new(id).with_sentiment(SentimentValue::Number(score))
    }

    #[test]
    fn test_resolve_bucket_date() {
        assert_eq!(
            resolve_bucket_date("2025-04-19T14:49:23Z").as_deref(),
            Some("2025-04-19")
        );
        assert_eq!(
            resolve_bucket_date("2025-04-19_14-49-23").as_deref(),
            Some("2025-04-19")
        );
        assert_eq!(
            resolve_bucket_date("posted 2025-04-20 at noon").as_deref(),
            Some("2025-04-20")
        );
        assert_eq!(resolve_bucket_date("2025-04-19").as_deref(), Some("2025-04-19"));
        assert_eq!(resolve_bucket_date("yesterday"), None);
        assert_eq!(resolve_bucket_date(""), None);
    }

    #[test]
    fn test_per_day_buckets_sorted() {
        let posts = vec![
            PostRecord::new("a", "2025-04-20T08:00:00Z"),
            PostRecord::new("b", "2025-04-19_14-49-23"),
            PostRecord::new("c", "2025-04-19T23:59:59Z"),
            PostRecord::new("d", "sometime"),
        ];
        let index = PostTimeIndex::from_posts(&posts);
        let records = vec![
            scored("a", 80.0),
            scored("b", 70.0),
            scored("c", 20.0),
            scored("d", 90.0),
            scored("missing", 90.0),
        ];

        let series = per_day_sentiment(&records, &index);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].date, "2025-04-19");
        assert_eq!(series[0].positive, 50);
        assert_eq!(series[0].negative, 50);
        assert_eq!(series[0].neutral, 0);
        assert_eq!(series[0].overall, 45.0);
        assert_eq!(series[1].date, "2025-04-20");
        assert_eq!(series[1].positive, 100);
        assert_eq!(series[1].overall, 80.0);
    }

    #[test]
    fn test_per_day_empty() {
        assert!(per_day_sentiment(&[], &PostTimeIndex::default()).is_empty());
    }

    #[test]
    fn test_trend() {
        let mut records: Vec<_> = (0..10).map(|i| scored(&i.to_string(), 40.0)).collect();
        assert_eq!(sentiment_trend(&records, 10), SentimentTrend::Stable);

        records.extend((10..20).map(|i| scored(&i.to_string(), 60.0)));
        assert_eq!(sentiment_trend(&records, 10), SentimentTrend::Up);

        records.extend((20..30).map(|i| scored(&i.to_string(), 41.0)));
        assert_eq!(sentiment_trend(&records, 10), SentimentTrend::Down);

        records.extend((30..40).map(|i| scored(&i.to_string(), 42.5)));
        assert_eq!(sentiment_trend(&records, 10), SentimentTrend::Stable);
        assert_eq!(sentiment_trend(&records, 0), SentimentTrend::Stable);
    }

    #[test]
    fn test_trend_with_oversized_window() {
        let records = vec![scored("1", 90.0)];
        assert_eq!(sentiment_trend(&records, usize::MAX / 2 + 1), SentimentTrend::Stable);
        assert_eq!(sentiment_trend(&records, usize::MAX), SentimentTrend::Stable);
    }
}
