use crate::cache::{CacheStats, MemoCache, Snapshot, SnapshotId};
use crate::indicators::{indicator_breakdown, IndicatorTally};
use crate::stats::{sentiment_stats, SentimentStats};
use crate::taxonomy::Taxonomy;
use crate::timeline::{per_day_sentiment, sentiment_trend, DailySentiment, PostTimeIndex, SentimentTrend};
use disaster_core::{AnalyticsConfig, ClassificationRecord, Genre, IndicatorKey, PostRecord};
use std::sync::Arc;
use tracing::debug;

/// Hit/miss counters per memoized operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineCacheStats {
    pub stats: CacheStats,
    pub indicators: CacheStats,
    pub timeline: CacheStats,
}

/// Memoizing front for the aggregate computations.
///
/// Results are cached per snapshot identity, so asking twice about the same
/// snapshot returns the same `Arc`. A fresh snapshot always recomputes.
pub struct AnalyticsEngine {
    taxonomy: Arc<Taxonomy>,
    indicator_keys: Vec<IndicatorKey>,
    genre_keys: Vec<Genre>,
    trend_window: usize,
    stats_cache: MemoCache<SnapshotId, SentimentStats>,
    indicator_cache: MemoCache<SnapshotId, IndicatorTally>,
    timeline_cache: MemoCache<(SnapshotId, SnapshotId), Vec<DailySentiment>>,
}

impl AnalyticsEngine {
    pub fn new(taxonomy: Arc<Taxonomy>, cache_capacity: usize, trend_window: usize) -> Self {
        Self {
            taxonomy,
            indicator_keys: IndicatorKey::ALL.to_vec(),
            genre_keys: Genre::ALL.to_vec(),
            trend_window,
            stats_cache: MemoCache::new(cache_capacity),
            indicator_cache: MemoCache::new(cache_capacity),
            timeline_cache: MemoCache::new(cache_capacity),
        }
    }

    pub fn from_config(config: &AnalyticsConfig) -> Self {
        let taxonomy = Taxonomy::builtin().with_entries(&config.taxonomy);
        Self::new(Arc::new(taxonomy), config.cache_capacity, config.trend_window)
    }

    /// Restricts the tally to the given keys.
    pub fn with_keys(mut self, indicator_keys: Vec<IndicatorKey>, genre_keys: Vec<Genre>) -> Self {
        self.indicator_keys = indicator_keys;
        self.genre_keys = genre_keys;
        self
    }

    pub fn taxonomy(&self) -> &Arc<Taxonomy> {
        &self.taxonomy
    }

    pub fn sentiment_stats(&self, records: &Snapshot<ClassificationRecord>) -> Arc<SentimentStats> {
        self.stats_cache.get_or_compute(records.id(), || {
            debug!(
                "Computing sentiment stats for snapshot {} ({} records)",
                records.id(),
                records.len()
            );
            sentiment_stats(records)
        })
    }

    pub fn indicator_breakdown(
        &self,
        records: &Snapshot<ClassificationRecord>,
    ) -> Arc<IndicatorTally> {
        self.indicator_cache.get_or_compute(records.id(), || {
            debug!(
                "Computing indicator tally for snapshot {} ({} records)",
                records.id(),
                records.len()
            );
            indicator_breakdown(records, &self.indicator_keys, &self.genre_keys)
        })
    }

    /// Keyed on both snapshots: new posts with the same classifications still
    /// recompute.
    pub fn per_day_sentiment(
        &self,
        records: &Snapshot<ClassificationRecord>,
        posts: &Snapshot<PostRecord>,
    ) -> Arc<Vec<DailySentiment>> {
        self.timeline_cache
            .get_or_compute((records.id(), posts.id()), || {
                let index = PostTimeIndex::from_posts(posts);
                let series = per_day_sentiment(records, &index);
                debug!(
                    "Computed {} daily buckets for snapshots {}/{}",
                    series.len(),
                    records.id(),
                    posts.id()
                );
                series
            })
    }

    pub fn sentiment_trend(&self, records: &Snapshot<ClassificationRecord>) -> SentimentTrend {
        sentiment_trend(records, self.trend_window)
    }

    pub fn cache_stats(&self) -> EngineCacheStats {
        EngineCacheStats {
            stats: self.stats_cache.stats(),
            indicators: self.indicator_cache.stats(),
            timeline: self.timeline_cache.stats(),
        }
    }
}

impl Default for AnalyticsEngine {
    fn default() -> Self {
        Self::from_config(&AnalyticsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use disaster_core::SentimentValue;

    fn snapshot() -> Snapshot<ClassificationRecord> {
        Snapshot::new(vec![
            ClassificationRecord::new("1")
                .with_sentiment(SentimentValue::Number(75.0))
                .with_indicator(IndicatorKey::Fire),
            ClassificationRecord::new("2").with_sentiment(SentimentValue::Number(25.0)),
        ])
    }

    #[test]
    fn test_stats_memoized_per_snapshot() {
        let engine = AnalyticsEngine::default();
        let records = snapshot();
        let first = engine.sentiment_stats(&records);
        let second = engine.sentiment_stats(&records.clone());
        assert!(Arc::ptr_eq(&first, &second));

        let rebuilt = Snapshot::new(records.to_vec());
        let third = engine.sentiment_stats(&rebuilt);
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(*first, *third);

        let stats = engine.cache_stats().stats;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
    }

    #[test]
    fn test_restricted_keys() {
        let engine = AnalyticsEngine::default().with_keys(vec![IndicatorKey::Fire], vec![]);
        let tally = engine.indicator_breakdown(&snapshot());
        assert_eq!(tally.get("fire"), Some(1));
        assert_eq!(tally.get("water"), None);
        assert_eq!(tally.len(), 4);
    }

    #[test]
    fn test_timeline_keyed_on_both_snapshots() {
        let engine = AnalyticsEngine::default();
        let records = snapshot();
        let posts = Snapshot::new(vec![PostRecord::new("1", "2025-04-19T10:00:00Z")]);
        let first = engine.per_day_sentiment(&records, &posts);
        assert!(Arc::ptr_eq(&first, &engine.per_day_sentiment(&records, &posts)));
        assert_eq!(first.len(), 1);

        let more_posts = Snapshot::new(vec![
            PostRecord::new("1", "2025-04-19T10:00:00Z"),
            PostRecord::new("2", "2025-04-20T10:00:00Z"),
        ]);
        let second = engine.per_day_sentiment(&records, &more_posts);
        assert_eq!(second.len(), 2);
    }
}
