use crate::{Category, ConfigError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

pub const ENV_STORE_URL: &str = "DISASTER_WATCH_STORE_URL";
pub const ENV_STORE_KEY: &str = "DISASTER_WATCH_STORE_KEY";
pub const ENV_DATABASE_URL: &str = "DISASTER_WATCH_DATABASE_URL";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Rest,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub rest_url: Option<String>,
    pub api_key: Option<String>,
    pub database_url: String,
    /// Rows per page when paging through post search results.
    pub page_size: usize,
    /// Post ids per classification lookup.
    pub classification_batch_size: usize,
    pub request_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Rest,
            rest_url: None,
            api_key: None,
            database_url: "sqlite://disaster_watch.db".to_string(),
            page_size: 1000,
            classification_batch_size: 200,
            request_timeout_secs: 30,
        }
    }
}

/// Extra or overriding taxonomy entry for an indicator key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyEntryConfig {
    pub key: String,
    pub category: Category,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub cache_capacity: usize,
    pub trend_window: usize,
    pub taxonomy: Vec<TaxonomyEntryConfig>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 16,
            trend_window: 10,
            taxonomy: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub analytics: AnalyticsConfig,
}

impl AppConfig {
    /// Loads configuration from an optional TOML file, then applies
    /// environment overrides and validates the result.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        info!(
            "Configuration loaded (backend: {:?}, cache capacity: {})",
            config.store.backend, config.analytics.cache_capacity
        );
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => ConfigError::InvalidFormat {
                details: format!("{}: {}", path.display(), e),
            },
        })?;
        debug!("Read configuration from {}", path.display());
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Environment values win over file values.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_STORE_URL).filter(|v| !v.trim().is_empty()) {
            self.store.rest_url = Some(url);
        }
        if let Some(key) = lookup(ENV_STORE_KEY).filter(|v| !v.trim().is_empty()) {
            self.store.api_key = Some(key);
        }
        if let Some(url) = lookup(ENV_DATABASE_URL).filter(|v| !v.trim().is_empty()) {
            self.store.database_url = url;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.backend == StoreBackend::Rest {
            if self.store.rest_url.is_none() {
                return Err(ConfigError::MissingEnvironmentVariable {
                    var_name: ENV_STORE_URL.to_string(),
                });
            }
            if self.store.api_key.is_none() {
                return Err(ConfigError::MissingEnvironmentVariable {
                    var_name: ENV_STORE_KEY.to_string(),
                });
            }
        }
        if self.store.backend == StoreBackend::Sqlite && self.store.database_url.trim().is_empty()
        {
            return Err(ConfigError::MissingField {
                field: "store.database_url".to_string(),
            });
        }
        for (field, value) in [
            ("store.page_size", self.store.page_size),
            (
                "store.classification_batch_size",
                self.store.classification_batch_size,
            ),
            ("analytics.cache_capacity", self.analytics.cache_capacity),
            ("analytics.trend_window", self.analytics.trend_window),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: value.to_string(),
                });
            }
        }
        if let Some(entry) = self
            .analytics
            .taxonomy
            .iter()
            .find(|entry| entry.key.trim().is_empty())
        {
            return Err(ConfigError::ValidationFailed {
                reason: format!(
                    "taxonomy entry '{}' has an empty key",
                    entry.display_name
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.store.page_size, 1000);
        assert_eq!(config.store.classification_batch_size, 200);
        assert_eq!(config.analytics.trend_window, 10);
        assert_eq!(config.store.backend, StoreBackend::Rest);
    }

    #[test]
    fn test_from_toml_with_taxonomy() {
        let raw = r#"
            [store]
            backend = "sqlite"
            database_url = "sqlite://test.db"

            [analytics]
            cache_capacity = 4

            [[analytics.taxonomy]]
            key = "landslide"
            category = "Elements"
            display_name = "Landslide"
        "#;
        let config = AppConfig::from_toml(raw).unwrap();
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.store.page_size, 1000);
        assert_eq!(config.analytics.cache_capacity, 4);
        assert_eq!(config.analytics.taxonomy[0].category, Category::Elements);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides_and_validation() {
        let mut config = AppConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingEnvironmentVariable { var_name }) if var_name == ENV_STORE_URL
        ));

        let env: HashMap<&str, &str> = [
            (ENV_STORE_URL, "https://example.supabase.co"),
            (ENV_STORE_KEY, "anon-key"),
        ]
        .into_iter()
        .collect();
        config.apply_env_overrides(|name| env.get(name).map(|v| v.to_string()));
        assert_eq!(
            config.store.rest_url.as_deref(),
            Some("https://example.supabase.co")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut config = AppConfig::default();
        config.store.backend = StoreBackend::Sqlite;
        config.store.classification_batch_size = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "store.classification_batch_size"
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::from_file(Path::new("/nonexistent/disaster-watch.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_malformed_toml() {
        let err = AppConfig::from_toml("[store\nbackend = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
