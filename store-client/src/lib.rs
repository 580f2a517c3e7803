pub mod api;
pub mod metrics;

pub use api::StoreClient;
pub use metrics::{MetricsCollector, RequestMetrics, StoreMetrics, TableMetrics};
