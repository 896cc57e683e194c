use std::collections::HashMap;
use std::collections::hash_map::Entry;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::jobs::{JobRecord, JobTransition};

use super::JobStore;

/// Process-local store; records live until discarded or the process exits.
#[derive(Default)]
pub struct MemoryJobStore {
    records: RwLock<HashMap<String, JobRecord>>,
}

impl MemoryJobStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether no records are held.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, record: &JobRecord) -> Result<(), StoreError> {
        match self.records.write().await.entry(record.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(record.id.clone())),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>, StoreError> {
        Ok(self.records.read().await.get(job_id).cloned())
    }

    async fn transition(
        &self,
        job_id: &str,
        transition: JobTransition,
    ) -> Result<JobRecord, StoreError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(job_id)
            .ok_or_else(|| StoreError::NotFound(job_id.to_string()))?;
        record.apply(transition)?;
        Ok(record.clone())
    }

    async fn discard(&self, job_id: &str) -> Result<(), StoreError> {
        self.records.write().await.remove(job_id);
        Ok(())
    }
}
