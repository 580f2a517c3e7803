use disaster_core::{AidRequest, AidRequestStatus, CoreError};
use serde::Serialize;

/// Pending/in-progress/completed tallies for the request panel header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AidRequestCounts {
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
}

/// Locally held aid requests, newest first.
#[derive(Debug, Clone, Default)]
pub struct AidRequestBoard {
    requests: Vec<AidRequest>,
}

impl AidRequestBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the board with requests loaded from the store.
    pub fn load(&mut self, mut requests: Vec<AidRequest>) {
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.requests = requests;
    }

    pub fn add(&mut self, request: AidRequest) {
        self.requests.insert(0, request);
    }

    pub fn get(&self, id: &str) -> Option<&AidRequest> {
        self.requests.iter().find(|request| request.id == id)
    }

    /// Status the request would move to next.
    pub fn next_status(&self, id: &str) -> Result<AidRequestStatus, CoreError> {
        self.get(id)
            .map(|request| request.status.advance())
            .ok_or_else(|| CoreError::NotFound {
                resource: format!("aid request {id}"),
            })
    }

    pub fn advance(&mut self, id: &str) -> Result<AidRequestStatus, CoreError> {
        let request = self
            .requests
            .iter_mut()
            .find(|request| request.id == id)
            .ok_or_else(|| CoreError::NotFound {
                resource: format!("aid request {id}"),
            })?;
        request.status = request.status.advance();
        Ok(request.status)
    }

    pub fn requests(&self) -> &[AidRequest] {
        &self.requests
    }

    pub fn counts(&self) -> AidRequestCounts {
        let mut counts = AidRequestCounts::default();
        for request in &self.requests {
            match request.status {
                AidRequestStatus::Pending => counts.pending += 1,
                AidRequestStatus::InProgress => counts.in_progress += 1,
                AidRequestStatus::Completed => counts.completed += 1,
            }
        }
        counts
    }
}
