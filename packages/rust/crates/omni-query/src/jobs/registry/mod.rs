//! Worker registry: the execution pool's control channel.
//!
//! Every worker periodically publishes a [`WorkerStats`] heartbeat with a TTL;
//! the `workers` health probe treats any unexpired entry as an active worker.

mod memory;
mod valkey;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

pub use memory::MemoryWorkerRegistry;
pub use valkey::ValkeyWorkerRegistry;

/// Heartbeat payload published by one worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStats {
    /// Unique worker id (stable for the worker's lifetime).
    pub worker_id: String,
    /// Operator-facing pool label.
    pub label: String,
    /// Jobs finished (either outcome).
    pub processed: u64,
    /// Jobs finished as FAILED.
    pub failed: u64,
    /// Whether the worker is executing a job right now.
    pub busy: bool,
    /// Publication time.
    pub last_seen: DateTime<Utc>,
}

/// Heartbeat sink and inspection surface shared by workers and the health probe.
#[async_trait]
pub trait WorkerRegistry: Send + Sync {
    /// Publish (or refresh) `stats`; the entry expires after `ttl` without refresh.
    async fn heartbeat(&self, stats: &WorkerStats, ttl: Duration) -> Result<(), RegistryError>;

    /// Remove a worker's entry immediately (clean shutdown).
    async fn deregister(&self, worker_id: &str) -> Result<(), RegistryError>;

    /// Unexpired entries, sorted by worker id.
    async fn active_workers(&self) -> Result<Vec<WorkerStats>, RegistryError>;
}
