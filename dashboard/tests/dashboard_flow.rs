use dashboard::{fetch_search_results, Dashboard, DashboardState, Message, SearchResults};
use disaster_core::{
    AidPriority, AidRequest, AidRequestForm, AidRequestStatus, ClassificationRecord, CoreError,
    ErrorReporter, IndicatorKey, PostRecord, RecordStore, SearchQuery, SentimentValue, StoreError,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Default)]
struct MemoryStore {
    posts: Vec<PostRecord>,
    classifications: Vec<ClassificationRecord>,
    aid_requests: Mutex<Vec<AidRequest>>,
    fail_posts: AtomicBool,
    fail_classifications: AtomicBool,
    fail_aid_requests: AtomicBool,
}

fn unavailable() -> CoreError {
    CoreError::Store(StoreError::ServerError { status_code: 503 })
}

impl RecordStore for MemoryStore {
    async fn search_posts(&self, search_text: &str) -> Result<Vec<PostRecord>, CoreError> {
        if self.fail_posts.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let needle = search_text.to_lowercase();
        Ok(self
            .posts
            .iter()
            .filter(|post| post.query.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn fetch_classifications(
        &self,
        post_ids: &[String],
    ) -> Result<Vec<ClassificationRecord>, CoreError> {
        if self.fail_classifications.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self
            .classifications
            .iter()
            .filter(|record| post_ids.contains(&record.post_id))
            .cloned()
            .collect())
    }

    async fn list_aid_requests(&self) -> Result<Vec<AidRequest>, CoreError> {
        if self.fail_aid_requests.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self.aid_requests.lock().unwrap().clone())
    }

    async fn insert_aid_request(&self, request: &AidRequest) -> Result<(), CoreError> {
        self.aid_requests.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn update_aid_request_status(
        &self,
        id: &str,
        status: AidRequestStatus,
    ) -> Result<(), CoreError> {
        let mut requests = self.aid_requests.lock().unwrap();
        let request = requests
            .iter_mut()
            .find(|request| request.id == id)
            .ok_or_else(|| CoreError::NotFound {
                resource: id.to_string(),
            })?;
        request.status = status;
        Ok(())
    }
}

fn seeded_store() -> MemoryStore {
    let posts = vec![
        PostRecord {
            query: "Myanmar earthquake 2025".to_string(),
            username: "relief_mm".to_string(),
            text: "Roads blocked near Mandalay https://t.co/abc".to_string(),
            ..PostRecord::new("1", "2025-03-28T09:15:00Z")
        },
        PostRecord {
            query: "Myanmar earthquake 2025".to_string(),
            text: "Volunteers arriving".to_string(),
            ..PostRecord::new("2", "2025-03-29T11:00:00Z")
        },
        PostRecord {
            query: "Nepal flood 2024".to_string(),
            ..PostRecord::new("3", "2024-07-01T08:00:00Z")
        },
    ];
    let classifications = vec![
        ClassificationRecord::new("1")
            .with_sentiment(SentimentValue::Number(20.0))
            .with_indicator(IndicatorKey::Transport),
        ClassificationRecord::new("2").with_sentiment(SentimentValue::Text("80".to_string())),
        ClassificationRecord::new("3").with_sentiment(SentimentValue::Number(50.0)),
    ];
    MemoryStore {
        posts,
        classifications,
        ..Default::default()
    }
}

fn query() -> SearchQuery {
    SearchQuery::new("Myanmar", "earthquake", "2025")
}

#[tokio::test]
async fn test_search_populates_view() {
    let mut dashboard = Dashboard::new(seeded_store(), DashboardState::default());
    dashboard.search(&query()).await.unwrap();

    let view = dashboard.view();
    assert_eq!(view.search_text, "Myanmar earthquake 2025");
    assert_eq!(view.posts.len(), 2);
    assert_eq!(view.posts[0].text, "Roads blocked near Mandalay");
    assert_eq!(view.posts[0].sentiment, "Negative");
    assert_eq!(view.sentiment.score, 50.0);
    assert_eq!(view.sentiment.breakdown.positive, 50);
    assert_eq!(view.sentiment.breakdown.negative, 50);
    assert_eq!(view.timeline.labels, vec!["2025-03-28", "2025-03-29"]);
}

#[tokio::test]
async fn test_stale_search_is_discarded() {
    let store = seeded_store();
    let reporter = ErrorReporter::new();
    let mut state = DashboardState::default();

    let first = state.begin_search();
    let second = state.begin_search();

    let newer = fetch_search_results(&store, &query(), &reporter).await.unwrap();
    let older = fetch_search_results(&store, &SearchQuery::new("Nepal", "flood", "2024"), &reporter)
        .await
        .unwrap();

    state
        .update(Message::SnapshotLoaded {
            generation: second,
            results: newer,
        })
        .unwrap();
    state
        .update(Message::SnapshotLoaded {
            generation: first,
            results: older,
        })
        .unwrap();

    assert_eq!(state.view().search_text, "Myanmar earthquake 2025");
    assert_eq!(state.posts().len(), 2);
}

#[tokio::test]
async fn test_overlapping_searches_keep_newest() {
    let mut dashboard = Dashboard::new(seeded_store(), DashboardState::default());
    let nepal = SearchQuery::new("Nepal", "flood", "2024");

    let first = dashboard.begin_search();
    let second = dashboard.begin_search();
    let myanmar = query();
    let (older, newer) = tokio::join!(dashboard.fetch(&nepal), dashboard.fetch(&myanmar));

    dashboard.apply_search(second, newer.unwrap()).unwrap();
    dashboard.apply_search(first, older.unwrap()).unwrap();

    let view = dashboard.view();
    assert_eq!(view.search_text, "Myanmar earthquake 2025");
    assert_eq!(view.posts.len(), 2);
}

#[tokio::test]
async fn test_failed_fetch_yields_empty_results() {
    let store = seeded_store();
    store.fail_posts.store(true, Ordering::SeqCst);

    let results = fetch_search_results(&store, &query(), &ErrorReporter::new())
        .await
        .unwrap();
    assert!(results.posts.is_empty());
    assert!(results.classifications.is_empty());

    store.fail_posts.store(false, Ordering::SeqCst);
    store.fail_classifications.store(true, Ordering::SeqCst);
    let mut dashboard = Dashboard::new(store, DashboardState::default());
    dashboard.search(&query()).await.unwrap();

    let view = dashboard.view();
    assert_eq!(dashboard.state().posts().len(), 2);
    assert!(view.posts.is_empty(), "posts hidden without classifications");
    assert_eq!(view.sentiment.score, 50.0);
}

#[tokio::test]
async fn test_invalid_query_is_an_error() {
    let store = seeded_store();
    let err = fetch_search_results(
        &store,
        &SearchQuery::new("Myanmar", " ", "2025"),
        &ErrorReporter::new(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CoreError::InvalidInput { .. }));

    let mut dashboard = Dashboard::new(store, DashboardState::default());
    assert!(dashboard.search(&SearchQuery::new("", "flood", "2024")).await.is_err());
    assert_eq!(dashboard.view().search_text, "");
}

#[tokio::test]
async fn test_aid_request_flow() {
    let mut dashboard = Dashboard::new(MemoryStore::default(), DashboardState::default());

    let created = dashboard
        .submit_aid_request(AidRequestForm::new(
            "Medical",
            "Yangon",
            "Insulin for clinic",
            AidPriority::High,
        ))
        .await
        .unwrap();
    assert_eq!(created.status, AidRequestStatus::Pending);
    assert_eq!(dashboard.view().aid_requests.len(), 1);

    let status = dashboard.advance_aid_request(&created.id).await.unwrap();
    assert_eq!(status, AidRequestStatus::InProgress);
    assert_eq!(
        dashboard.store().aid_requests.lock().unwrap()[0].status,
        AidRequestStatus::InProgress
    );

    dashboard.advance_aid_request(&created.id).await.unwrap();
    let counts = dashboard.view().aid_request_counts;
    assert_eq!(counts.completed, 1);
    assert_eq!(counts.pending, 0);

    let err = dashboard
        .submit_aid_request(AidRequestForm::new("Food", "", "Rice", AidPriority::Low))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidInput { .. }));
    assert!(matches!(
        dashboard.advance_aid_request("missing").await,
        Err(CoreError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_refresh_failure_keeps_local_requests() {
    let store = MemoryStore::default();
    let mut dashboard = Dashboard::new(store, DashboardState::default());
    dashboard
        .submit_aid_request(AidRequestForm::new("Water", "Bago", "Bottled water", AidPriority::Medium))
        .await
        .unwrap();

    dashboard.store().fail_aid_requests.store(true, Ordering::SeqCst);
    dashboard.refresh_aid_requests().await.unwrap();
    assert_eq!(dashboard.view().aid_requests.len(), 1);

    dashboard.store().fail_aid_requests.store(false, Ordering::SeqCst);
    dashboard.refresh_aid_requests().await.unwrap();
    assert_eq!(dashboard.view().aid_requests.len(), 1);
}

#[test]
fn test_default_results_are_empty() {
    let results = SearchResults::default();
    assert!(results.posts.is_empty());
    assert!(results.search_text.is_empty());
}
