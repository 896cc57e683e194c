use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::RegistryError;

use super::{WorkerRegistry, WorkerStats};

/// Stand-in expiry for a TTL too large to add to the clock.
const FAR_FUTURE_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Process-local registry used when the pool and the probe share one process.
#[derive(Default)]
pub struct MemoryWorkerRegistry {
    entries: RwLock<HashMap<String, (WorkerStats, Instant)>>,
}

impl MemoryWorkerRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkerRegistry for MemoryWorkerRegistry {
    async fn heartbeat(&self, stats: &WorkerStats, ttl: Duration) -> Result<(), RegistryError> {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .or_else(|| now.checked_add(FAR_FUTURE_TTL))
            .unwrap_or(now);
        self.entries
            .write()
            .await
            .insert(stats.worker_id.clone(), (stats.clone(), expires_at));
        Ok(())
    }

    async fn deregister(&self, worker_id: &str) -> Result<(), RegistryError> {
        self.entries.write().await.remove(worker_id);
        Ok(())
    }

    async fn active_workers(&self) -> Result<Vec<WorkerStats>, RegistryError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        let mut active: Vec<WorkerStats> =
            entries.values().map(|(stats, _)| stats.clone()).collect();
        active.sort_by(|a, b| a.worker_id.cmp(&b.worker_id));
        Ok(active)
    }
}
