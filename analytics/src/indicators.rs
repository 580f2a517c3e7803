//! Indicator frequency tally and the paged, filterable indicator board.

use crate::sentiment::{categorize, parse_sentiment};
use crate::taxonomy::Taxonomy;
use disaster_core::{Category, ClassificationRecord, Genre, IndicatorKey, SentimentCategory};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

pub const INDICATOR_PAGE_SIZE: usize = 10;

/// Count per tally key: indicator keys, `genre_*` keys and `sentiment_*` keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IndicatorTally {
    counts: BTreeMap<String, u64>,
}

impl IndicatorTally {
    pub fn get(&self, key: &str) -> Option<u64> {
        self.counts.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.counts.iter().map(|(key, count)| (key.as_str(), *count))
    }

    pub fn sentiment_total(&self) -> u64 {
        SentimentCategory::ALL
            .iter()
            .filter_map(|category| self.get(category.tally_key()))
            .sum()
    }

    /// Entries by descending count; equal counts keep key order.
    pub fn sorted_desc(&self) -> Vec<(String, u64)> {
        let mut entries: Vec<(String, u64)> = self
            .counts
            .iter()
            .map(|(key, count)| (key.clone(), *count))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries
    }

    fn zero(&mut self, key: &str) {
        self.counts.insert(key.to_string(), 0);
    }

    fn bump(&mut self, key: &str) {
        if let Some(count) = self.counts.get_mut(key) {
            *count += 1;
        }
    }
}

/// Tallies flagged indicators, genres and sentiment buckets.
///
/// Every requested key starts at zero so absent indicators still show up.
/// Each record bumps at most one genre key and exactly one sentiment key,
/// so the sentiment keys always sum to `records.len()`.
pub fn indicator_breakdown(
    records: &[ClassificationRecord],
    indicator_keys: &[IndicatorKey],
    genre_keys: &[Genre],
) -> IndicatorTally {
    let mut tally = IndicatorTally::default();
    for key in indicator_keys {
        tally.zero(key.as_str());
    }
    for genre in genre_keys {
        tally.zero(genre.tally_key());
    }
    for category in SentimentCategory::ALL {
        tally.zero(category.tally_key());
    }

    for record in records {
        for key in indicator_keys {
            if record.indicators.contains(*key) {
                tally.bump(key.as_str());
            }
        }
        if let Some(genre) = record.genre.filter(|genre| genre_keys.contains(genre)) {
            tally.bump(genre.tally_key());
        }
        tally.bump(categorize(parse_sentiment(record)).tally_key());
    }

    tally
}

/// Tally keys flagged on a single record, indicators first.
pub fn active_indicator_keys(record: &ClassificationRecord) -> Vec<&'static str> {
    let mut keys: Vec<&'static str> = record.indicators.iter().map(IndicatorKey::as_str).collect();
    if let Some(genre) = record.genre {
        keys.push(genre.tally_key());
    }
    keys
}

/// One page of the indicator board.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndicatorPage {
    pub entries: Vec<(String, u64)>,
    /// Page actually shown after clamping.
    pub page: usize,
    pub total_pages: usize,
    /// Last page whose first entry has a non-zero count.
    pub last_page: usize,
}

impl IndicatorPage {
    pub fn has_previous(&self) -> bool {
        self.page > 0
    }

    pub fn has_next(&self) -> bool {
        self.page < self.last_page
    }
}

/// Category filter and pager over an [`IndicatorTally`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorBoard {
    enabled: BTreeSet<Category>,
    page: usize,
    page_size: usize,
}

impl Default for IndicatorBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl IndicatorBoard {
    pub fn new() -> Self {
        Self {
            enabled: Category::ALL.into_iter().collect(),
            page: 0,
            page_size: INDICATOR_PAGE_SIZE,
        }
    }

    pub fn toggle(&mut self, category: Category) {
        if !self.enabled.remove(&category) {
            self.enabled.insert(category);
        }
    }

    pub fn is_enabled(&self, category: Category) -> bool {
        self.enabled.contains(&category)
    }

    pub fn enabled(&self) -> impl Iterator<Item = Category> + '_ {
        self.enabled.iter().copied()
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    /// Entries in enabled categories, by descending count.
    pub fn entries(&self, tally: &IndicatorTally, taxonomy: &Taxonomy) -> Vec<(String, u64)> {
        tally
            .sorted_desc()
            .into_iter()
            .filter(|(key, _)| self.is_enabled(taxonomy.category_of(key)))
            .collect()
    }

    pub fn page(&self, tally: &IndicatorTally, taxonomy: &Taxonomy) -> IndicatorPage {
        let entries = self.entries(tally, taxonomy);
        let total_pages = entries.len().div_ceil(self.page_size);

        let mut last_page = 0;
        for page in 0..total_pages {
            match entries.get(page * self.page_size) {
                Some((_, count)) if *count > 0 => last_page = page,
                _ => break,
            }
        }

        let page = self.page.min(last_page);
        let start = (page * self.page_size).min(entries.len());
        let end = (start + self.page_size).min(entries.len());

        IndicatorPage {
            entries: entries[start..end].to_vec(),
            page,
            total_pages,
            last_page,
        }
    }
}
