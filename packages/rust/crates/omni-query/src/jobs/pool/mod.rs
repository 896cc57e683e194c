//! Execution pool: long-lived workers pulling units of work from the durable queue.
//!
//! Each worker blocks on [`JobQueue::dequeue`] with a bounded wait, marks the
//! record RUNNING, runs the answering capability under a per-job timeout, then
//! records SUCCEEDED or FAILED. Alongside every worker a heartbeat task
//! publishes [`WorkerStats`] into the worker registry until the worker stops.

mod heartbeat;
mod worker;

use std::sync::Arc;
use std::time::Duration;

use omni_answer::AnsweringCapability;
use tokio::sync::watch;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::jobs::{JobQueue, JobStore, WorkerRegistry};

use heartbeat::{HeartbeatConfig, WorkerCounters, run_heartbeat};
use worker::{WorkerContext, run_worker};

pub use worker::compute_retry_backoff_ms;

/// Execution pool tuning.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of concurrent workers.
    pub concurrency: usize,
    /// Per-job execution timeout in seconds.
    pub job_timeout_secs: u64,
    /// Upper bound on one blocking dequeue, in milliseconds.
    pub dequeue_wait_ms: u64,
    /// Heartbeat publication interval in seconds.
    pub heartbeat_interval_secs: u64,
    /// Heartbeat entry lifetime in seconds.
    pub heartbeat_ttl_secs: u64,
    /// Label prefixed to generated worker ids.
    pub worker_label: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            job_timeout_secs: 900,
            dequeue_wait_ms: 2_000,
            heartbeat_interval_secs: 10,
            heartbeat_ttl_secs: 30,
            worker_label: "omni-query".to_string(),
        }
    }
}

/// Running set of workers; dropping it without [`ExecutionPool::shutdown`] aborts them.
pub struct ExecutionPool {
    shutdown_tx: watch::Sender<bool>,
    workers: JoinSet<()>,
    worker_ids: Vec<String>,
}

impl ExecutionPool {
    /// Spawn `config.concurrency` workers (minimum 1) on the current runtime.
    pub fn start(
        mut config: PoolConfig,
        queue: Arc<dyn JobQueue>,
        store: Arc<dyn JobStore>,
        capability: Arc<dyn AnsweringCapability>,
        registry: Arc<dyn WorkerRegistry>,
    ) -> Self {
        config.concurrency = config.concurrency.max(1);
        config.job_timeout_secs = config.job_timeout_secs.max(1);
        config.dequeue_wait_ms = config.dequeue_wait_ms.max(10);
        config.heartbeat_interval_secs = config.heartbeat_interval_secs.max(1);
        config.heartbeat_ttl_secs = config
            .heartbeat_ttl_secs
            .max(config.heartbeat_interval_secs.saturating_add(1));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let pool_id = Uuid::new_v4().simple().to_string();
        let pool_id = &pool_id[..8];
        let mut workers = JoinSet::new();
        let mut worker_ids = Vec::with_capacity(config.concurrency);

        for index in 0..config.concurrency {
            let worker_id = format!("{}-{pool_id}-{index}", config.worker_label);
            let counters = Arc::new(WorkerCounters::default());
            let context = WorkerContext {
                worker_id: worker_id.clone(),
                queue: Arc::clone(&queue),
                store: Arc::clone(&store),
                capability: Arc::clone(&capability),
                job_timeout: Duration::from_secs(config.job_timeout_secs),
                dequeue_wait: Duration::from_millis(config.dequeue_wait_ms),
                counters: Arc::clone(&counters),
            };
            let heartbeat = HeartbeatConfig {
                worker_id: worker_id.clone(),
                label: config.worker_label.clone(),
                interval: Duration::from_secs(config.heartbeat_interval_secs),
                ttl: Duration::from_secs(config.heartbeat_ttl_secs),
            };
            let registry = Arc::clone(&registry);
            let worker_shutdown = shutdown_rx.clone();

            workers.spawn(async move {
                let (heartbeat_stop_tx, heartbeat_stop_rx) = watch::channel(false);
                let heartbeat_task = tokio::spawn(run_heartbeat(
                    registry,
                    heartbeat,
                    counters,
                    heartbeat_stop_rx,
                ));
                run_worker(context, worker_shutdown).await;
                let _ = heartbeat_stop_tx.send(true);
                if let Err(error) = heartbeat_task.await {
                    tracing::error!("worker heartbeat task crashed: {error}");
                }
            });
            worker_ids.push(worker_id);
        }

        tracing::info!(
            workers = config.concurrency,
            job_timeout_secs = config.job_timeout_secs,
            dequeue_wait_ms = config.dequeue_wait_ms,
            "execution pool started"
        );

        Self {
            shutdown_tx,
            workers,
            worker_ids,
        }
    }

    /// Ids of the spawned workers (as published in the registry).
    pub fn worker_ids(&self) -> &[String] {
        &self.worker_ids
    }

    /// Stop dequeueing, let in-flight jobs finish, and wait for every worker.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(true);
        while let Some(result) = self.workers.join_next().await {
            if let Err(error) = result {
                tracing::error!("execution pool worker crashed: {error}");
            }
        }
        tracing::info!("execution pool stopped");
    }
}
