use crate::{AidRequest, AidRequestStatus, ClassificationRecord, CoreError, PostRecord};

/// Query/insert surface of the relational store holding posts,
/// classifications and aid requests.
///
/// The returned futures carry no `Send` bound; callers await them on the
/// current task and never hand them to `tokio::spawn`.
#[allow(async_fn_in_trait)]
pub trait RecordStore {
    /// Posts whose search query matches `search_text`, newest first.
    async fn search_posts(&self, search_text: &str) -> Result<Vec<PostRecord>, CoreError>;

    /// Classification rows for the given post ids. An empty id list yields an
    /// empty result without touching the store.
    async fn fetch_classifications(
        &self,
        post_ids: &[String],
    ) -> Result<Vec<ClassificationRecord>, CoreError>;

    async fn list_aid_requests(&self) -> Result<Vec<AidRequest>, CoreError>;

    async fn insert_aid_request(&self, request: &AidRequest) -> Result<(), CoreError>;

    async fn update_aid_request_status(
        &self,
        id: &str,
        status: AidRequestStatus,
    ) -> Result<(), CoreError>;
}
