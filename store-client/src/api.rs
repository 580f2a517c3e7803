use crate::metrics::{MetricsCollector, RequestMetrics, StoreMetrics};
use disaster_core::{
    AidRequest, AidRequestStatus, ClassificationRecord, CoreError, IndicatorKey, PostRecord,
    RecordStore, StoreConfig, StoreError, ConfigError,
};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use url::Url;

const REST_PREFIX: &str = "rest/v1/";
pub const POSTS_TABLE: &str = "tweets";
pub const CLASSIFICATIONS_TABLE: &str = "predictions";
pub const AID_REQUESTS_TABLE: &str = "requests";

/// Fixed classification columns requested ahead of the indicator columns.
const CLASSIFICATION_BASE_COLUMNS: [&str; 5] = ["tweet_id", "username", "tweet", "sentiment", "genre"];

fn classification_columns() -> String {
    CLASSIFICATION_BASE_COLUMNS
        .iter()
        .copied()
        .chain(IndicatorKey::ALL.iter().map(|key| key.as_str()))
        .collect::<Vec<_>>()
        .join(",")
}

/// PostgREST client for the hosted record store.
#[derive(Debug)]
pub struct StoreClient {
    http_client: Client,
    base_url: Url,
    api_key: String,
    page_size: usize,
    batch_size: usize,
    metrics: Arc<MetricsCollector>,
}

impl StoreClient {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, CoreError> {
        Self::with_timeout(base_url, api_key, Duration::from_secs(30))
    }

    pub fn with_timeout(
        base_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CoreError> {
        // A trailing slash keeps `join` from dropping the last path segment.
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized).map_err(|e| {
            CoreError::Config(ConfigError::InvalidValue {
                field: "store.rest_url".to_string(),
                value: format!("{base_url} ({e})"),
            })
        })?;

        let http_client = Client::builder()
            .user_agent(concat!("disaster-watch/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url,
            api_key: api_key.into(),
            page_size: 1000,
            batch_size: 200,
            metrics: Arc::new(MetricsCollector::new()),
        })
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self, CoreError> {
        let rest_url = config.rest_url.as_deref().ok_or_else(|| ConfigError::MissingField {
            field: "store.rest_url".to_string(),
        })?;
        let api_key = config.api_key.clone().ok_or_else(|| ConfigError::MissingField {
            field: "store.api_key".to_string(),
        })?;
        Ok(Self::with_timeout(
            rest_url,
            api_key,
            Duration::from_secs(config.request_timeout_secs),
        )?
        .with_page_size(config.page_size)
        .with_batch_size(config.classification_batch_size))
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub async fn make_request(
        &self,
        method: Method,
        table: &str,
        query_params: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<Response, CoreError> {
        let url = self
            .base_url
            .join(REST_PREFIX)
            .and_then(|rest| rest.join(table))
            .map_err(|e| CoreError::Internal {
                message: format!("invalid table path '{table}': {e}"),
            })?;

        let mut request_builder = self
            .http_client
            .request(method.clone(), url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(query_params);

        if let Some(body) = body {
            request_builder = request_builder
                .header("Prefer", "return=minimal")
                .json(body);
        }

        debug!("Store request: {} {}", method, table);
        let start_time = Instant::now();
        let result = request_builder.send().await;
        let response_time = start_time.elapsed();

        let outcome = match result {
            Ok(response) if response.status().is_success() => Ok(response),
            Ok(response) => Err(self.map_status(table, response).await),
            Err(e) if e.is_timeout() => {
                error!("Store request timed out for {} {}", method, table);
                Err(CoreError::Store(StoreError::RequestTimeout))
            }
            Err(e) => {
                error!("Network error for {} {}: {}", method, table, e);
                Err(CoreError::Network(e))
            }
        };

        let (status_code, error_type) = match &outcome {
            Ok(response) => (Some(response.status().as_u16()), None),
            Err(CoreError::Store(store_error)) => (status_of(store_error), Some(store_error.to_string())),
            Err(other) => (None, Some(other.to_string())),
        };
        self.metrics
            .record_request(RequestMetrics {
                table: table.to_string(),
                method: method.to_string(),
                status_code,
                response_time,
                success: outcome.is_ok(),
                rate_limited: matches!(
                    outcome,
                    Err(CoreError::Store(StoreError::RateLimitExceeded { .. }))
                ),
                error_type,
            })
            .await;

        outcome
    }

    async fn map_status(&self, table: &str, response: Response) -> CoreError {
        let status = response.status();
        error!("Store request failed with status: {} for {}", status, table);

        let store_error = match status {
            StatusCode::UNAUTHORIZED => StoreError::Unauthorized,
            StatusCode::FORBIDDEN => StoreError::Forbidden {
                table: table.to_string(),
            },
            StatusCode::NOT_FOUND => StoreError::TableNotFound {
                table: table.to_string(),
            },
            StatusCode::REQUEST_TIMEOUT => StoreError::RequestTimeout,
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.parse::<u64>().ok())
                    .unwrap_or(60);
                warn!("Rate limited, retry after {} seconds", retry_after);
                StoreError::RateLimitExceeded { retry_after }
            }
            status if status.is_server_error() => StoreError::ServerError {
                status_code: status.as_u16(),
            },
            status => StoreError::BadRequest {
                status_code: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            },
        };
        CoreError::Store(store_error)
    }

    async fn get_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        query_params: &[(&str, String)],
    ) -> Result<Vec<T>, CoreError> {
        let response = self
            .make_request(Method::GET, table, query_params, None)
            .await?;
        let rows: Vec<T> = response.json().await.map_err(|e| {
            error!("Failed to parse {} rows: {}", table, e);
            CoreError::Store(StoreError::InvalidResponse {
                details: format!("Failed to parse rows from {table}: {e}"),
            })
        })?;
        self.metrics.record_rows(rows.len()).await;
        Ok(rows)
    }

    pub async fn get_metrics(&self) -> StoreMetrics {
        self.metrics.get_metrics().await
    }

    pub async fn reset_metrics(&self) {
        self.metrics.reset_metrics().await;
    }
}

fn status_of(error: &StoreError) -> Option<u16> {
    match error {
        StoreError::Unauthorized => Some(401),
        StoreError::Forbidden { .. } => Some(403),
        StoreError::TableNotFound { .. } => Some(404),
        StoreError::RequestTimeout => None,
        StoreError::RateLimitExceeded { .. } => Some(429),
        StoreError::BadRequest { status_code, .. } | StoreError::ServerError { status_code } => {
            Some(*status_code)
        }
        StoreError::InvalidResponse { .. } => None,
    }
}

impl RecordStore for StoreClient {
    /// Pages through all matching posts. An empty search text matches every
    /// post.
    async fn search_posts(&self, search_text: &str) -> Result<Vec<PostRecord>, CoreError> {
        let mut posts = Vec::new();
        let mut offset = 0;

        loop {
            let mut params = vec![
                ("select", "*".to_string()),
                ("order", "time.desc".to_string()),
                ("offset", offset.to_string()),
                ("limit", self.page_size.to_string()),
            ];
            if !search_text.is_empty() {
                params.push(("query", format!("ilike.*{search_text}*")));
            }

            let page: Vec<PostRecord> = self.get_rows(POSTS_TABLE, &params).await?;
            let page_len = page.len();
            posts.extend(page);

            if page_len < self.page_size {
                break;
            }
            offset += self.page_size;
        }

        info!("Retrieved {} posts for '{}'", posts.len(), search_text);
        Ok(posts)
    }

    async fn fetch_classifications(
        &self,
        post_ids: &[String],
    ) -> Result<Vec<ClassificationRecord>, CoreError> {
        if post_ids.is_empty() {
            debug!("No post ids, skipping classification lookup");
            return Ok(Vec::new());
        }

        let columns = classification_columns();
        let mut records = Vec::with_capacity(post_ids.len());
        for batch in post_ids.chunks(self.batch_size) {
            let params = [
                ("select", columns.clone()),
                ("tweet_id", format!("in.({})", batch.join(","))),
            ];
            let rows: Vec<ClassificationRecord> =
                self.get_rows(CLASSIFICATIONS_TABLE, &params).await?;
            debug!("Batch of {} ids returned {} classifications", batch.len(), rows.len());
            records.extend(rows);
        }

        info!(
            "Retrieved {} classifications for {} posts",
            records.len(),
            post_ids.len()
        );
        Ok(records)
    }

    async fn list_aid_requests(&self) -> Result<Vec<AidRequest>, CoreError> {
        let params = [
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
        ];
        self.get_rows(AID_REQUESTS_TABLE, &params).await
    }

    async fn insert_aid_request(&self, request: &AidRequest) -> Result<(), CoreError> {
        let body = serde_json::to_value(request)?;
        self.make_request(Method::POST, AID_REQUESTS_TABLE, &[], Some(&body))
            .await?;
        info!("Stored aid request {}", request.id);
        Ok(())
    }

    async fn update_aid_request_status(
        &self,
        id: &str,
        status: AidRequestStatus,
    ) -> Result<(), CoreError> {
        let body = json!({ "status": status });
        self.make_request(
            Method::PATCH,
            AID_REQUESTS_TABLE,
            &[("id", format!("eq.{id}"))],
            Some(&body),
        )
        .await?;
        info!("Aid request {} is now {}", id, status);
        Ok(())
    }
}
