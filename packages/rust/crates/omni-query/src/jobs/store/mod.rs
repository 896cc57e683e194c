//! Job record persistence.

mod memory;
mod valkey;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::jobs::{JobRecord, JobTransition};

pub use memory::MemoryJobStore;
pub use valkey::ValkeyJobStore;

/// Keyed job record storage with a guarded status write path.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new record; fails with [`StoreError::Duplicate`] if the id exists.
    async fn create(&self, record: &JobRecord) -> Result<(), StoreError>;

    /// Fetch a record by id.
    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>, StoreError>;

    /// Apply `transition` atomically and return the updated record.
    ///
    /// Regressions are rejected with [`StoreError::Transition`] and leave the
    /// stored record unchanged.
    async fn transition(
        &self,
        job_id: &str,
        transition: JobTransition,
    ) -> Result<JobRecord, StoreError>;

    /// Remove a record (used when enqueue fails after creation).
    async fn discard(&self, job_id: &str) -> Result<(), StoreError>;
}
