use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Binary indicator columns produced by the post classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKey {
    Request,
    Offer,
    AidRelated,
    MedicalHelp,
    MedicalProducts,
    SearchAndRescue,
    Security,
    Military,
    ChildAlone,
    Water,
    Food,
    Shelter,
    Clothing,
    Money,
    MissingPeople,
    Refugees,
    Death,
    OtherAid,
    InfrastructureRelated,
    Transport,
    Buildings,
    Electricity,
    Tools,
    Hospitals,
    Shops,
    AidCenters,
    OtherInfrastructure,
    WeatherRelated,
    Floods,
    Storm,
    Fire,
    Earthquake,
    Cold,
    OtherWeather,
    DirectReport,
    Related,
}

impl IndicatorKey {
    pub const ALL: [IndicatorKey; 36] = [
        IndicatorKey::Request,
        IndicatorKey::Offer,
        IndicatorKey::AidRelated,
        IndicatorKey::MedicalHelp,
        IndicatorKey::MedicalProducts,
        IndicatorKey::SearchAndRescue,
        IndicatorKey::Security,
        IndicatorKey::Military,
        IndicatorKey::ChildAlone,
        IndicatorKey::Water,
        IndicatorKey::Food,
        IndicatorKey::Shelter,
        IndicatorKey::Clothing,
        IndicatorKey::Money,
        IndicatorKey::MissingPeople,
        IndicatorKey::Refugees,
        IndicatorKey::Death,
        IndicatorKey::OtherAid,
        IndicatorKey::InfrastructureRelated,
        IndicatorKey::Transport,
        IndicatorKey::Buildings,
        IndicatorKey::Electricity,
        IndicatorKey::Tools,
        IndicatorKey::Hospitals,
        IndicatorKey::Shops,
        IndicatorKey::AidCenters,
        IndicatorKey::OtherInfrastructure,
        IndicatorKey::WeatherRelated,
        IndicatorKey::Floods,
        IndicatorKey::Storm,
        IndicatorKey::Fire,
        IndicatorKey::Earthquake,
        IndicatorKey::Cold,
        IndicatorKey::OtherWeather,
        IndicatorKey::DirectReport,
        IndicatorKey::Related,
    ];

    /// Column name in the classification table.
    pub fn as_str(self) -> &'static str {
        match self {
            IndicatorKey::Request => "request",
            IndicatorKey::Offer => "offer",
            IndicatorKey::AidRelated => "aid_related",
            IndicatorKey::MedicalHelp => "medical_help",
            IndicatorKey::MedicalProducts => "medical_products",
            IndicatorKey::SearchAndRescue => "search_and_rescue",
            IndicatorKey::Security => "security",
            IndicatorKey::Military => "military",
            IndicatorKey::ChildAlone => "child_alone",
            IndicatorKey::Water => "water",
            IndicatorKey::Food => "food",
            IndicatorKey::Shelter => "shelter",
            IndicatorKey::Clothing => "clothing",
            IndicatorKey::Money => "money",
            IndicatorKey::MissingPeople => "missing_people",
            IndicatorKey::Refugees => "refugees",
            IndicatorKey::Death => "death",
            IndicatorKey::OtherAid => "other_aid",
            IndicatorKey::InfrastructureRelated => "infrastructure_related",
            IndicatorKey::Transport => "transport",
            IndicatorKey::Buildings => "buildings",
            IndicatorKey::Electricity => "electricity",
            IndicatorKey::Tools => "tools",
            IndicatorKey::Hospitals => "hospitals",
            IndicatorKey::Shops => "shops",
            IndicatorKey::AidCenters => "aid_centers",
            IndicatorKey::OtherInfrastructure => "other_infrastructure",
            IndicatorKey::WeatherRelated => "weather_related",
            IndicatorKey::Floods => "floods",
            IndicatorKey::Storm => "storm",
            IndicatorKey::Fire => "fire",
            IndicatorKey::Earthquake => "earthquake",
            IndicatorKey::Cold => "cold",
            IndicatorKey::OtherWeather => "other_weather",
            IndicatorKey::DirectReport => "direct_report",
            IndicatorKey::Related => "related",
        }
    }

    fn bit(self) -> u64 {
        1u64 << (self as u8)
    }
}

impl fmt::Display for IndicatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndicatorKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IndicatorKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| format!("unknown indicator key: {s}"))
    }
}

/// Set of indicators flagged `"yes"` on a single record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct IndicatorFlags(u64);

impl IndicatorFlags {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, key: IndicatorKey) {
        self.0 |= key.bit();
    }

    pub fn remove(&mut self, key: IndicatorKey) {
        self.0 &= !key.bit();
    }

    pub fn contains(&self, key: IndicatorKey) -> bool {
        self.0 & key.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = IndicatorKey> + '_ {
        IndicatorKey::ALL
            .iter()
            .copied()
            .filter(move |key| self.contains(*key))
    }
}

impl FromIterator<IndicatorKey> for IndicatorFlags {
    fn from_iter<I: IntoIterator<Item = IndicatorKey>>(iter: I) -> Self {
        let mut flags = IndicatorFlags::new();
        for key in iter {
            flags.insert(key);
        }
        flags
    }
}

/// Source genre of a classified post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Genre {
    Social,
    News,
    Direct,
}

impl Genre {
    pub const ALL: [Genre; 3] = [Genre::Social, Genre::News, Genre::Direct];

    pub fn as_str(self) -> &'static str {
        match self {
            Genre::Social => "social",
            Genre::News => "news",
            Genre::Direct => "direct",
        }
    }

    /// Key under which the genre is counted in indicator tallies.
    pub fn tally_key(self) -> &'static str {
        match self {
            Genre::Social => "genre_social",
            Genre::News => "genre_news",
            Genre::Direct => "genre_direct",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "social" => Some(Genre::Social),
            "news" => Some(Genre::News),
            "direct" => Some(Genre::Direct),
            _ => None,
        }
    }
}

/// Three-way sentiment partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SentimentCategory {
    Positive,
    Neutral,
    Negative,
}

impl SentimentCategory {
    pub const ALL: [SentimentCategory; 3] = [
        SentimentCategory::Positive,
        SentimentCategory::Neutral,
        SentimentCategory::Negative,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SentimentCategory::Positive => "Positive",
            SentimentCategory::Neutral => "Neutral",
            SentimentCategory::Negative => "Negative",
        }
    }

    pub fn tally_key(self) -> &'static str {
        match self {
            SentimentCategory::Positive => "sentiment_positive",
            SentimentCategory::Neutral => "sentiment_neutral",
            SentimentCategory::Negative => "sentiment_negative",
        }
    }
}

/// Indicator category used for filtering and coloring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Sentiment,
    Damages,
    Elements,
    Requests,
    Miscellaneous,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Sentiment,
        Category::Damages,
        Category::Elements,
        Category::Requests,
        Category::Miscellaneous,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Sentiment => "Sentiment",
            Category::Damages => "Damages",
            Category::Elements => "Elements",
            Category::Requests => "Requests",
            Category::Miscellaneous => "Miscellaneous",
        }
    }
}

/// Raw sentiment column. The store returns numbers, numeric strings, or junk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SentimentValue {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

/// One classifier output row, keyed by post id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ClassificationRow", into = "ClassificationRow")]
pub struct ClassificationRecord {
    pub post_id: String,
    pub sentiment: Option<SentimentValue>,
    pub indicators: IndicatorFlags,
    pub genre: Option<Genre>,
    pub username: Option<String>,
    pub text: Option<String>,
}

impl ClassificationRecord {
    pub fn new(post_id: impl Into<String>) -> Self {
        Self {
            post_id: post_id.into(),
            sentiment: None,
            indicators: IndicatorFlags::new(),
            genre: None,
            username: None,
            text: None,
        }
    }

    pub fn with_sentiment(mut self, sentiment: SentimentValue) -> Self {
        self.sentiment = Some(sentiment);
        self
    }

    pub fn with_indicator(mut self, key: IndicatorKey) -> Self {
        self.indicators.insert(key);
        self
    }

    pub fn with_genre(mut self, genre: Genre) -> Self {
        self.genre = Some(genre);
        self
    }
}

/// Wire shape of a classification row: fixed columns plus one column per
/// indicator holding `"yes"` or anything else.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClassificationRow {
    #[serde(rename = "tweet_id", deserialize_with = "string_or_number")]
    post_id: String,
    #[serde(default)]
    sentiment: Option<SentimentValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(default, rename = "tweet", skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(flatten)]
    columns: HashMap<String, serde_json::Value>,
}

impl From<ClassificationRow> for ClassificationRecord {
    fn from(row: ClassificationRow) -> Self {
        let indicators = IndicatorKey::ALL
            .iter()
            .copied()
            .filter(|key| {
                matches!(row.columns.get(key.as_str()), Some(serde_json::Value::String(v)) if v == "yes")
            })
            .collect();

        Self {
            post_id: row.post_id,
            sentiment: row.sentiment,
            indicators,
            genre: row.genre.as_deref().and_then(Genre::parse),
            username: row.username,
            text: row.text,
        }
    }
}

impl From<ClassificationRecord> for ClassificationRow {
    fn from(record: ClassificationRecord) -> Self {
        let columns = IndicatorKey::ALL
            .iter()
            .map(|key| {
                let flag = if record.indicators.contains(*key) { "yes" } else { "no" };
                (key.as_str().to_string(), serde_json::Value::from(flag))
            })
            .collect();

        Self {
            post_id: record.post_id,
            sentiment: record.sentiment,
            genre: record.genre.map(|g| g.as_str().to_string()),
            username: record.username,
            text: record.text,
            columns,
        }
    }
}

/// One raw social-media post.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    #[serde(rename = "tweet_id", deserialize_with = "string_or_number")]
    pub post_id: String,
    #[serde(rename = "time", default, deserialize_with = "lenient_text")]
    pub timestamp: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub query: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub language: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub username: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub verified: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub followers: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub location: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub retweets: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub favorites: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub replies: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub text: String,
}

impl PostRecord {
    pub fn new(post_id: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            post_id: post_id.into(),
            timestamp: timestamp.into(),
            ..Default::default()
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(self.verified.trim(), "true" | "True" | "1" | "yes")
    }

    pub fn retweet_count(&self) -> u64 {
        parse_count(&self.retweets)
    }

    pub fn favorite_count(&self) -> u64 {
        parse_count(&self.favorites)
    }

    pub fn reply_count(&self) -> u64 {
        parse_count(&self.replies)
    }

    pub fn follower_count(&self) -> u64 {
        parse_count(&self.followers)
    }
}

fn parse_count(raw: &str) -> u64 {
    let trimmed = raw.trim();
    trimmed
        .parse::<u64>()
        .ok()
        .or_else(|| trimmed.parse::<f64>().ok().map(|v| v.max(0.0) as u64))
        .unwrap_or(0)
}

/// Operator search over the post store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub country: String,
    pub disaster_type: String,
    pub year: String,
}

impl SearchQuery {
    pub fn new(
        country: impl Into<String>,
        disaster_type: impl Into<String>,
        year: impl Into<String>,
    ) -> Self {
        Self {
            country: country.into(),
            disaster_type: disaster_type.into(),
            year: year.into(),
        }
    }

    /// Free-text search string sent to the post store.
    pub fn search_text(&self) -> Result<String, crate::CoreError> {
        let parts = [
            ("country", self.country.trim()),
            ("disaster_type", self.disaster_type.trim()),
            ("year", self.year.trim()),
        ];
        if let Some((field, _)) = parts.iter().find(|(_, value)| value.is_empty()) {
            return Err(crate::CoreError::InvalidInput {
                message: format!("search field '{field}' must not be empty"),
            });
        }
        Ok(parts
            .iter()
            .map(|(_, value)| *value)
            .collect::<Vec<_>>()
            .join(" "))
    }
}

/// Disaster types offered by the search form.
pub const DISASTER_TYPES: [(&str, &str); 8] = [
    ("flood", "Flood"),
    ("earthquake", "Earthquake"),
    ("cyclone", "Cyclone/Typhoon"),
    ("drought", "Drought"),
    ("wildfire", "Wildfire"),
    ("landslide", "Landslide"),
    ("tsunami", "Tsunami"),
    ("volcanic", "Volcanic Activity"),
];

/// Search key for a disaster type given either its key or its label.
pub fn disaster_type_key(raw: &str) -> Option<&'static str> {
    let raw = raw.trim();
    DISASTER_TYPES
        .iter()
        .find(|(key, label)| key.eq_ignore_ascii_case(raw) || label.eq_ignore_ascii_case(raw))
        .map(|(key, _)| *key)
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum WireId {
        Text(String),
        Signed(i64),
        Unsigned(u64),
    }

    Ok(match WireId::deserialize(deserializer)? {
        WireId::Text(s) => s,
        WireId::Signed(n) => n.to_string(),
        WireId::Unsigned(n) => n.to_string(),
    })
}

/// Text column that may arrive as null, a number or a bool.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}
