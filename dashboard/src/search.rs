//! Search fetches and the guard against out-of-order results.

use analytics::Snapshot;
use disaster_core::{
    ClassificationRecord, CoreError, ErrorExt, ErrorReporter, PostRecord, RecordStore, SearchQuery,
};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Posts and classifications returned for one search.
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub search_text: String,
    pub posts: Snapshot<PostRecord>,
    pub classifications: Snapshot<ClassificationRecord>,
}

/// Hands out increasing generations; only the latest one may be applied.
#[derive(Debug, Default)]
pub struct SearchCoordinator {
    latest: AtomicU64,
}

impl SearchCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a search, superseding any still in flight.
    pub fn begin(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.latest()
    }
}

/// Runs a search against `store`.
///
/// An invalid query is an error. Store failures are reported and yield an
/// empty result instead, indistinguishable from a search with no matches.
pub async fn fetch_search_results<S: RecordStore>(
    store: &S,
    query: &SearchQuery,
    reporter: &ErrorReporter,
) -> Result<SearchResults, CoreError> {
    let search_text = query.search_text()?;

    let posts = match store.search_posts(&search_text).await {
        Ok(posts) => posts,
        Err(e) => {
            reporter.report_warning(&e);
            debug!("Post search failed ({}), showing no results", e.error_code());
            Vec::new()
        }
    };

    let post_ids: Vec<String> = posts.iter().map(|post| post.post_id.clone()).collect();
    let classifications = match store.fetch_classifications(&post_ids).await {
        Ok(records) => records,
        Err(e) => {
            reporter.report_warning(&e);
            debug!("Classification lookup failed ({}), showing none", e.error_code());
            Vec::new()
        }
    };

    info!(
        "Search '{}' returned {} posts and {} classifications",
        search_text,
        posts.len(),
        classifications.len()
    );

    Ok(SearchResults {
        search_text,
        posts: Snapshot::new(posts),
        classifications: Snapshot::new(classifications),
    })
}
