use crate::requests::{AidRequestBoard, AidRequestCounts};
use crate::search::{fetch_search_results, SearchCoordinator, SearchResults};
use analytics::{
    active_indicator_keys, bar_chart_data, line_chart_data, parse_sentiment, sentiment_label,
    AnalyticsEngine, BarChartData, IndicatorBoard, IndicatorPage, LineChartData, LineChartMode,
    SentimentBreakdown, SentimentLevel, SentimentTrend, Snapshot,
};
use disaster_core::{
    format_timestamp, post_url, strip_links, AidRequest, AidRequestForm, AidRequestStatus,
    AnalyticsConfig, Category, ClassificationRecord, CoreError, ErrorExt, ErrorReporter,
    PostRecord, RecordStore, SearchQuery,
};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub enum Message {
    SnapshotLoaded {
        generation: u64,
        results: SearchResults,
    },
    ToggleCategory(Category),
    SetIndicatorPage(usize),
    NextIndicatorPage,
    PreviousIndicatorPage,
    SetChartMode(LineChartMode),
    AidRequestsLoaded(Vec<AidRequest>),
    SubmitAidRequest(AidRequest),
    AdvanceAidRequest(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentPanel {
    pub score: f64,
    pub level: &'static str,
    pub breakdown: SentimentBreakdown,
    pub trend: SentimentTrend,
    pub trend_symbol: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndicatorRow {
    pub key: String,
    pub display_name: String,
    pub category: Category,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorPanel {
    pub enabled_categories: Vec<Category>,
    pub page: usize,
    pub total_pages: usize,
    pub has_previous: bool,
    pub has_next: bool,
    pub rows: Vec<IndicatorRow>,
    pub chart: BarChartData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostView {
    pub post_id: String,
    pub username: String,
    pub timestamp: String,
    pub text: String,
    pub url: String,
    pub sentiment: &'static str,
    pub indicators: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub search_text: String,
    pub sentiment: SentimentPanel,
    pub chart_mode: LineChartMode,
    pub timeline: LineChartData,
    pub indicators: IndicatorPanel,
    pub posts: Vec<PostView>,
    pub aid_requests: Vec<AidRequest>,
    pub aid_request_counts: AidRequestCounts,
}

/// Everything the dashboard shows, driven by [`Message`]s.
pub struct DashboardState {
    engine: AnalyticsEngine,
    reporter: ErrorReporter,
    coordinator: SearchCoordinator,
    search_text: String,
    posts: Snapshot<PostRecord>,
    classifications: Snapshot<ClassificationRecord>,
    board: IndicatorBoard,
    chart_mode: LineChartMode,
    aid_requests: AidRequestBoard,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new(AnalyticsEngine::default())
    }
}

impl DashboardState {
    pub fn new(engine: AnalyticsEngine) -> Self {
        Self {
            engine,
            reporter: ErrorReporter::new(),
            coordinator: SearchCoordinator::new(),
            search_text: String::new(),
            posts: Snapshot::empty(),
            classifications: Snapshot::empty(),
            board: IndicatorBoard::new(),
            chart_mode: LineChartMode::default(),
            aid_requests: AidRequestBoard::new(),
        }
    }

    pub fn from_config(config: &AnalyticsConfig) -> Self {
        Self::new(AnalyticsEngine::from_config(config))
    }

    pub fn with_reporter(mut self, reporter: ErrorReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Generation for a search about to start.
    pub fn begin_search(&self) -> u64 {
        self.coordinator.begin()
    }

    pub fn reporter(&self) -> &ErrorReporter {
        &self.reporter
    }

    pub fn engine(&self) -> &AnalyticsEngine {
        &self.engine
    }

    pub fn posts(&self) -> &Snapshot<PostRecord> {
        &self.posts
    }

    pub fn classifications(&self) -> &Snapshot<ClassificationRecord> {
        &self.classifications
    }

    pub fn aid_requests(&self) -> &AidRequestBoard {
        &self.aid_requests
    }

    pub fn update(&mut self, message: Message) -> Result<(), CoreError> {
        match message {
            Message::SnapshotLoaded {
                generation,
                results,
            } => {
                if !self.coordinator.is_current(generation) {
                    debug!(
                        "Discarding results of superseded search {} (latest is {})",
                        generation,
                        self.coordinator.latest()
                    );
                    return Ok(());
                }
                self.search_text = results.search_text;
                self.posts = results.posts;
                self.classifications = results.classifications;
                self.board.set_page(0);
                Ok(())
            }
            Message::ToggleCategory(category) => {
                self.board.toggle(category);
                self.board.set_page(0);
                Ok(())
            }
            Message::SetIndicatorPage(page) => {
                self.board.set_page(page);
                Ok(())
            }
            Message::NextIndicatorPage => {
                let current = self.current_indicator_page();
                self.board.set_page(current + 1);
                Ok(())
            }
            Message::PreviousIndicatorPage => {
                let current = self.current_indicator_page();
                self.board.set_page(current.saturating_sub(1));
                Ok(())
            }
            Message::SetChartMode(mode) => {
                self.chart_mode = mode;
                Ok(())
            }
            Message::AidRequestsLoaded(requests) => {
                self.aid_requests.load(requests);
                Ok(())
            }
            Message::SubmitAidRequest(request) => {
                info!("New {} request for {}", request.request_type, request.location);
                self.aid_requests.add(request);
                Ok(())
            }
            Message::AdvanceAidRequest(id) => {
                let status = self.aid_requests.advance(&id)?;
                info!("Aid request {} moved to {}", id, status);
                Ok(())
            }
        }
    }

    fn current_indicator_page(&self) -> usize {
        let tally = self.engine.indicator_breakdown(&self.classifications);
        self.board.page(&tally, self.engine.taxonomy()).page
    }

    pub fn view(&self) -> DashboardView {
        let stats = self.engine.sentiment_stats(&self.classifications);
        let trend = self.engine.sentiment_trend(&self.classifications);
        let series = self
            .engine
            .per_day_sentiment(&self.classifications, &self.posts);
        let tally = self.engine.indicator_breakdown(&self.classifications);
        let taxonomy = self.engine.taxonomy();

        // Nothing to tally until classifications arrive.
        let page = if self.classifications.is_empty() {
            IndicatorPage::default()
        } else {
            self.board.page(&tally, taxonomy)
        };
        let rows = page
            .entries
            .iter()
            .map(|(key, count)| IndicatorRow {
                key: key.clone(),
                display_name: taxonomy.display_name(key),
                category: taxonomy.category_of(key),
                count: *count,
            })
            .collect();

        DashboardView {
            search_text: self.search_text.clone(),
            sentiment: SentimentPanel {
                score: stats.score,
                level: SentimentLevel::from_score(stats.score).label(),
                breakdown: stats.breakdown,
                trend,
                trend_symbol: trend.symbol(),
            },
            chart_mode: self.chart_mode,
            timeline: line_chart_data(&series, self.chart_mode),
            indicators: IndicatorPanel {
                enabled_categories: self.board.enabled().collect(),
                page: page.page,
                total_pages: page.total_pages,
                has_previous: page.has_previous(),
                has_next: page.has_next(),
                chart: bar_chart_data(&page.entries, taxonomy),
                rows,
            },
            posts: self.post_views(),
            aid_requests: self.aid_requests.requests().to_vec(),
            aid_request_counts: self.aid_requests.counts(),
        }
    }

    /// Posts are only listed once both posts and classifications arrived.
    fn post_views(&self) -> Vec<PostView> {
        if self.posts.is_empty() || self.classifications.is_empty() {
            return Vec::new();
        }

        let by_post: HashMap<&str, &ClassificationRecord> = self
            .classifications
            .iter()
            .map(|record| (record.post_id.as_str(), record))
            .collect();
        let taxonomy = self.engine.taxonomy();

        self.posts
            .iter()
            .map(|post| {
                let record = by_post.get(post.post_id.as_str()).copied();
                PostView {
                    post_id: post.post_id.clone(),
                    username: post.username.clone(),
                    timestamp: format_timestamp(&post.timestamp),
                    text: strip_links(&post.text),
                    url: post_url(post),
                    sentiment: sentiment_label(record.map(parse_sentiment)),
                    indicators: record
                        .map(|record| {
                            active_indicator_keys(record)
                                .into_iter()
                                .map(|key| taxonomy.display_name(key))
                                .collect()
                        })
                        .unwrap_or_default(),
                }
            })
            .collect()
    }
}

/// A [`DashboardState`] wired to a record store.
pub struct Dashboard<S> {
    store: S,
    state: DashboardState,
}

impl<S: RecordStore> Dashboard<S> {
    pub fn new(store: S, state: DashboardState) -> Self {
        Self { store, state }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn update(&mut self, message: Message) -> Result<(), CoreError> {
        self.state.update(message)
    }

    pub fn view(&self) -> DashboardView {
        self.state.view()
    }

    /// Runs one search to completion and shows its results.
    ///
    /// Holds `&mut self` across the fetch, so searches issued this way never
    /// overlap. Overlapping searches go through [`Dashboard::begin_search`],
    /// [`Dashboard::fetch`] and [`Dashboard::apply_search`].
    pub async fn search(&mut self, query: &SearchQuery) -> Result<(), CoreError> {
        let generation = self.begin_search();
        let results = self.fetch(query).await?;
        self.apply_search(generation, results)
    }

    pub fn begin_search(&self) -> u64 {
        self.state.begin_search()
    }

    pub async fn fetch(&self, query: &SearchQuery) -> Result<SearchResults, CoreError> {
        fetch_search_results(&self.store, query, self.state.reporter()).await
    }

    /// Shows `results` unless a newer search has begun since `generation`.
    pub fn apply_search(
        &mut self,
        generation: u64,
        results: SearchResults,
    ) -> Result<(), CoreError> {
        self.state.update(Message::SnapshotLoaded {
            generation,
            results,
        })
    }

    /// Reloads aid requests. On failure the local list is kept.
    pub async fn refresh_aid_requests(&mut self) -> Result<(), CoreError> {
        match self.store.list_aid_requests().await {
            Ok(requests) => self.state.update(Message::AidRequestsLoaded(requests)),
            Err(e) => {
                self.state.reporter().report_warning(&e);
                debug!("Keeping local aid requests ({})", e.error_code());
                Ok(())
            }
        }
    }

    pub async fn submit_aid_request(&mut self, form: AidRequestForm) -> Result<AidRequest, CoreError> {
        let request = form.into_request()?;
        self.store.insert_aid_request(&request).await?;
        self.state
            .update(Message::SubmitAidRequest(request.clone()))?;
        Ok(request)
    }

    pub async fn advance_aid_request(&mut self, id: &str) -> Result<AidRequestStatus, CoreError> {
        let next = self.state.aid_requests().next_status(id)?;
        self.store.update_aid_request_status(id, next).await?;
        self.state
            .update(Message::AdvanceAidRequest(id.to_string()))?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use disaster_core::{IndicatorKey, SentimentValue};

    fn results(count: usize) -> SearchResults {
        let posts: Vec<_> = (0..count)
            .map(|i| PostRecord {
                text: format!("post {i} https://t.co/x"),
                ..PostRecord::new(i.to_string(), "2025-04-19T10:00:00Z")
            })
            .collect();
        let records: Vec<_> = (0..count)
            .map(|i| {
                ClassificationRecord::new(i.to_string())
                    .with_sentiment(SentimentValue::Number(70.0))
                    .with_indicator(IndicatorKey::Water)
            })
            .collect();
        SearchResults {
            search_text: "Myanmar earthquake 2025".to_string(),
            posts: Snapshot::new(posts),
            classifications: Snapshot::new(records),
        }
    }

    #[test]
    fn test_snapshot_resets_indicator_page() {
        let mut state = DashboardState::default();
        state.update(Message::SetIndicatorPage(3)).unwrap();

        let generation = state.begin_search();
        state
            .update(Message::SnapshotLoaded {
                generation,
                results: results(2),
            })
            .unwrap();

        let view = state.view();
        assert_eq!(view.indicators.page, 0);
        assert_eq!(view.search_text, "Myanmar earthquake 2025");
        assert_eq!(view.posts.len(), 2);
        assert_eq!(view.posts[0].text, "post 0");
        assert_eq!(view.posts[0].sentiment, "Positive");
        assert_eq!(view.posts[0].indicators, vec!["Water"]);
        assert_eq!(view.posts[0].timestamp, "2025-04-19 10:00");
    }

    #[test]
    fn test_empty_state_view() {
        let view = DashboardState::default().view();
        assert_eq!(view.sentiment.score, 50.0);
        assert_eq!(view.sentiment.level, "Neutral");
        assert_eq!(view.sentiment.trend_symbol, "→");
        assert!(view.posts.is_empty());
        assert!(view.indicators.rows.is_empty());
        assert!(view.indicators.chart.labels.is_empty());
        assert_eq!(view.indicators.total_pages, 0);
        assert!(!view.indicators.has_next);
        assert!(view.timeline.labels.is_empty());
    }

    #[test]
    fn test_loaded_snapshot_keeps_zero_count_rows() {
        let mut state = DashboardState::default();
        let generation = state.begin_search();
        state
            .update(Message::SnapshotLoaded {
                generation,
                results: results(1),
            })
            .unwrap();

        let view = state.view();
        assert_eq!(view.indicators.rows.len(), 10);
        assert!(view.indicators.rows.iter().any(|row| row.count == 0));
        assert_eq!(view.indicators.chart.labels.len(), 10);
    }

    #[test]
    fn test_toggle_category_filters_rows() {
        let mut state = DashboardState::default();
        let generation = state.begin_search();
        state
            .update(Message::SnapshotLoaded {
                generation,
                results: results(3),
            })
            .unwrap();

        state.update(Message::ToggleCategory(Category::Sentiment)).unwrap();
        let view = state.view();
        assert!(!view.indicators.enabled_categories.contains(&Category::Sentiment));
        assert!(view
            .indicators
            .rows
            .iter()
            .all(|row| row.category != Category::Sentiment));
    }

    #[test]
    fn test_advance_unknown_request() {
        let mut state = DashboardState::default();
        let err = state
            .update(Message::AdvanceAidRequest("missing".to_string()))
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }
}
