use std::time::Duration;

use async_trait::async_trait;

use crate::error::RegistryError;
use crate::valkey::ValkeyClient;

use super::{WorkerRegistry, WorkerStats};

const SCAN_BATCH: usize = 100;

/// Heartbeats stored at `{prefix}:worker:{id}` with `SET ... EX`.
pub struct ValkeyWorkerRegistry {
    client: ValkeyClient,
    key_prefix: String,
}

impl ValkeyWorkerRegistry {
    /// Registry under `{key_prefix}:worker:*`.
    pub fn new(url: &str, key_prefix: &str) -> Result<Self, RegistryError> {
        let client = ValkeyClient::open(url, "worker_registry")
            .map_err(|error| RegistryError::Backend(error.to_string()))?;
        Ok(Self {
            client,
            key_prefix: key_prefix.to_string(),
        })
    }

    /// Key holding `worker_id`'s heartbeat.
    pub fn worker_key(&self, worker_id: &str) -> String {
        format!("{}:worker:{}", self.key_prefix, worker_id)
    }

    async fn scan_worker_keys(&self) -> Result<Vec<String>, RegistryError> {
        let pattern = format!("{}:worker:*", self.key_prefix);
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();
        loop {
            let (next, batch): (u64, Vec<String>) = self
                .client
                .run_command("worker_scan", || {
                    let mut cmd = redis::cmd("SCAN");
                    cmd.arg(cursor)
                        .arg("MATCH")
                        .arg(&pattern)
                        .arg("COUNT")
                        .arg(SCAN_BATCH);
                    cmd
                })
                .await
                .map_err(|error| RegistryError::Backend(error.to_string()))?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}

#[async_trait]
impl WorkerRegistry for ValkeyWorkerRegistry {
    async fn heartbeat(&self, stats: &WorkerStats, ttl: Duration) -> Result<(), RegistryError> {
        let key = self.worker_key(&stats.worker_id);
        let payload = serde_json::to_string(stats).map_err(|error| RegistryError::Malformed {
            worker_id: stats.worker_id.clone(),
            message: error.to_string(),
        })?;
        let ttl_secs = ttl.as_secs().max(1);
        let _: String = self
            .client
            .run_command("worker_heartbeat", || {
                let mut cmd = redis::cmd("SET");
                cmd.arg(&key).arg(&payload).arg("EX").arg(ttl_secs);
                cmd
            })
            .await
            .map_err(|error| RegistryError::Backend(error.to_string()))?;
        Ok(())
    }

    async fn deregister(&self, worker_id: &str) -> Result<(), RegistryError> {
        let key = self.worker_key(worker_id);
        let _: i64 = self
            .client
            .run_command("worker_deregister", || {
                let mut cmd = redis::cmd("DEL");
                cmd.arg(&key);
                cmd
            })
            .await
            .map_err(|error| RegistryError::Backend(error.to_string()))?;
        Ok(())
    }

    async fn active_workers(&self) -> Result<Vec<WorkerStats>, RegistryError> {
        let keys = self.scan_worker_keys().await?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let payloads: Vec<Option<String>> = self
            .client
            .run_command("worker_inspect", || {
                let mut cmd = redis::cmd("MGET");
                cmd.arg(&keys);
                cmd
            })
            .await
            .map_err(|error| RegistryError::Backend(error.to_string()))?;

        let mut active = Vec::with_capacity(payloads.len());
        for (key, payload) in keys.iter().zip(payloads) {
            // Expired between SCAN and MGET.
            let Some(payload) = payload else {
                continue;
            };
            match serde_json::from_str::<WorkerStats>(&payload) {
                Ok(stats) => active.push(stats),
                Err(error) => {
                    tracing::warn!(key = %key, error = %error, "ignoring malformed worker heartbeat");
                }
            }
        }
        active.sort_by(|a, b| a.worker_id.cmp(&b.worker_id));
        Ok(active)
    }
}
