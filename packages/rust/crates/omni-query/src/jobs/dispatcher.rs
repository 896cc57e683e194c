use std::sync::Arc;

use uuid::Uuid;

use crate::error::DispatchError;
use crate::jobs::{JobQueue, JobRecord, JobStore, UnitOfWork};
use crate::observability::ServiceEvent;

/// Accepts submissions: creates the PENDING record and enqueues its unit of work.
#[derive(Clone)]
pub struct JobDispatcher {
    queue: Arc<dyn JobQueue>,
    store: Arc<dyn JobStore>,
}

impl JobDispatcher {
    /// Dispatcher writing to `store` and producing into `queue`.
    pub fn new(queue: Arc<dyn JobQueue>, store: Arc<dyn JobStore>) -> Self {
        Self { queue, store }
    }

    /// Submit one query. Returns the new job id once the unit is enqueued.
    ///
    /// A blank query is rejected before anything is written; otherwise the
    /// text is stored as given. If enqueueing fails the freshly created record
    /// is discarded.
    pub async fn submit(&self, query: &str, use_web_search: bool) -> Result<String, DispatchError> {
        if query.trim().is_empty() {
            return Err(DispatchError::InvalidInput);
        }

        let job_id = Uuid::new_v4().to_string();
        let record = JobRecord::pending(job_id.clone(), query, use_web_search);
        self.store.create(&record).await.map_err(|error| {
            tracing::warn!(
                event = ServiceEvent::JobDispatchFailed.as_str(),
                job_id = %job_id,
                error = %error,
                "failed to create job record"
            );
            DispatchError::DispatchUnavailable(error.to_string())
        })?;

        let unit = UnitOfWork::for_record(&record);
        if let Err(error) = self.queue.enqueue(&unit).await {
            tracing::warn!(
                event = ServiceEvent::JobDispatchFailed.as_str(),
                job_id = %job_id,
                error = %error,
                "failed to enqueue job; discarding record"
            );
            if let Err(discard_error) = self.store.discard(&job_id).await {
                tracing::warn!(
                    event = ServiceEvent::JobStoreWriteFailed.as_str(),
                    job_id = %job_id,
                    error = %discard_error,
                    "failed to discard record after enqueue failure"
                );
            }
            return Err(DispatchError::DispatchUnavailable(error.to_string()));
        }

        tracing::info!(
            event = ServiceEvent::JobSubmitted.as_str(),
            job_id = %job_id,
            use_web_search,
            query_chars = query.chars().count(),
            "job submitted"
        );
        Ok(job_id)
    }

    /// Current record for `job_id`, if it exists.
    pub async fn get_status(&self, job_id: &str) -> Result<Option<JobRecord>, DispatchError> {
        Ok(self.store.get(job_id).await?)
    }
}
