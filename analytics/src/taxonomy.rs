//! Indicator taxonomy: key → category and key → display name.
//!
//! Built once from the table below plus optional configured entries, then
//! shared immutably. Lookups are total: unknown keys fall back to
//! [`Category::Miscellaneous`] and to the key with underscores turned into
//! spaces.

use disaster_core::{Category, TaxonomyEntryConfig};
use std::collections::HashMap;
use tracing::debug;

const BUILTIN: &[(&str, Category, &str)] = &[
    ("sentiment_positive", Category::Sentiment, "Positive"),
    ("sentiment_neutral", Category::Sentiment, "Neutral"),
    ("sentiment_negative", Category::Sentiment, "Negative"),
    ("genre_social", Category::Miscellaneous, "Social Media"),
    ("genre_news", Category::Miscellaneous, "News"),
    ("genre_direct", Category::Miscellaneous, "Direct Message"),
    ("request", Category::Requests, "General Request"),
    ("offer", Category::Requests, "General Offer"),
    ("aid_related", Category::Miscellaneous, "Aid Related"),
    ("medical_help", Category::Requests, "Medical Help"),
    ("medical_products", Category::Requests, "Medical Products"),
    ("search_and_rescue", Category::Miscellaneous, "Search and Rescue"),
    ("security", Category::Miscellaneous, "Security"),
    ("military", Category::Miscellaneous, "Military"),
    ("child_alone", Category::Damages, "Child Alone"),
    ("water", Category::Requests, "Water"),
    ("food", Category::Requests, "Food"),
    ("shelter", Category::Requests, "Shelter"),
    ("clothing", Category::Requests, "Clothing"),
    ("money", Category::Requests, "Money"),
    ("missing_people", Category::Miscellaneous, "Missing People"),
    ("refugees", Category::Miscellaneous, "Refugees"),
    ("death", Category::Damages, "Death"),
    ("other_aid", Category::Miscellaneous, "Other Aid"),
    ("infrastructure_related", Category::Damages, "Infrastructure"),
    ("transport", Category::Damages, "Transport"),
    ("buildings", Category::Damages, "Buildings"),
    ("electricity", Category::Damages, "Electricity"),
    ("tools", Category::Requests, "Tools"),
    ("hospitals", Category::Damages, "Hospitals"),
    ("shops", Category::Damages, "Shops"),
    ("aid_centers", Category::Requests, "Aid Centers"),
    ("other_infrastructure", Category::Damages, "Other Infrastructure"),
    ("weather_related", Category::Elements, "Weather Related"),
    ("floods", Category::Elements, "Floods"),
    ("storm", Category::Elements, "Storm"),
    ("fire", Category::Elements, "Fire"),
    ("earthquake", Category::Elements, "Earthquake"),
    ("cold", Category::Elements, "Cold"),
    ("other_weather", Category::Elements, "Other Weather"),
    ("direct_report", Category::Miscellaneous, "Direct Report"),
    ("related", Category::Miscellaneous, "Related"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonomyEntry {
    pub category: Category,
    pub display_name: String,
}

#[derive(Debug, Clone)]
pub struct Taxonomy {
    entries: HashMap<String, TaxonomyEntry>,
}

impl Taxonomy {
    pub fn builtin() -> Self {
        let entries = BUILTIN
            .iter()
            .map(|(key, category, display_name)| {
                (
                    key.to_string(),
                    TaxonomyEntry {
                        category: *category,
                        display_name: display_name.to_string(),
                    },
                )
            })
            .collect();
        Self { entries }
    }

    /// Adds or replaces entries, e.g. for indicator columns introduced after
    /// this build.
    pub fn with_entries(mut self, extra: &[TaxonomyEntryConfig]) -> Self {
        for entry in extra {
            debug!(
                "Taxonomy entry '{}' -> {} ({})",
                entry.key,
                entry.category.as_str(),
                entry.display_name
            );
            self.entries.insert(
                entry.key.clone(),
                TaxonomyEntry {
                    category: entry.category,
                    display_name: entry.display_name.clone(),
                },
            );
        }
        self
    }

    pub fn category_of(&self, key: &str) -> Category {
        self.entries
            .get(key)
            .map(|entry| entry.category)
            .unwrap_or(Category::Miscellaneous)
    }

    pub fn display_name(&self, key: &str) -> String {
        match self.entries.get(key) {
            Some(entry) => entry.display_name.clone(),
            None => key.replace('_', " "),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Bar color for a category.
pub fn category_bar_color(category: Category) -> &'static str {
    match category {
        Category::Sentiment => "rgba(96, 165, 250, 0.7)",
        Category::Damages => "rgba(251, 146, 60, 0.7)",
        Category::Elements => "rgba(129, 140, 248, 0.7)",
        Category::Requests => "rgba(6, 182, 212, 0.7)",
        Category::Miscellaneous => "rgba(192, 132, 252, 0.7)",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use disaster_core::{Genre, IndicatorKey, SentimentCategory};

    #[test]
    fn test_unknown_key_fallback() {
        let taxonomy = Taxonomy::builtin();
        assert_eq!(taxonomy.category_of("xyz_unmapped"), Category::Miscellaneous);
        assert_eq!(taxonomy.display_name("xyz_unmapped"), "xyz unmapped");
        assert_eq!(taxonomy.display_name("plain"), "plain");
    }

    #[test]
    fn test_builtin_lookups() {
        let taxonomy = Taxonomy::builtin();
        assert_eq!(taxonomy.category_of("water"), Category::Requests);
        assert_eq!(taxonomy.category_of("floods"), Category::Elements);
        assert_eq!(taxonomy.category_of("hospitals"), Category::Damages);
        assert_eq!(taxonomy.category_of("sentiment_negative"), Category::Sentiment);
        assert_eq!(taxonomy.display_name("genre_direct"), "Direct Message");
        assert_eq!(taxonomy.display_name("infrastructure_related"), "Infrastructure");
    }

    #[test]
    fn test_every_tally_key_is_mapped() {
        let taxonomy = Taxonomy::builtin();
        for key in IndicatorKey::ALL {
            assert!(taxonomy.contains(key.as_str()), "missing {}", key);
        }
        for genre in Genre::ALL {
            assert!(taxonomy.contains(genre.tally_key()));
        }
        for category in SentimentCategory::ALL {
            assert!(taxonomy.contains(category.tally_key()));
        }
    }

    #[test]
    fn test_configured_entries_override() {
        let taxonomy = Taxonomy::builtin().with_entries(&[
            TaxonomyEntryConfig {
                key: "landslide".to_string(),
                category: Category::Elements,
                display_name: "Landslide".to_string(),
            },
            TaxonomyEntryConfig {
                key: "related".to_string(),
                category: Category::Requests,
                display_name: "Relevant".to_string(),
            },
        ]);
        assert_eq!(taxonomy.category_of("landslide"), Category::Elements);
        assert_eq!(taxonomy.display_name("related"), "Relevant");
        assert_eq!(taxonomy.category_of("related"), Category::Requests);
    }
}
