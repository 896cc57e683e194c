use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;

use crate::jobs::{WorkerRegistry, WorkerStats};
use crate::observability::{ServiceEvent, should_surface_repeated_failure};

/// Counters shared between a worker loop and its heartbeat task.
#[derive(Debug, Default)]
pub(super) struct WorkerCounters {
    processed: AtomicU64,
    failed: AtomicU64,
    busy: AtomicBool,
}

impl WorkerCounters {
    pub(super) fn mark_busy(&self) {
        self.busy.store(true, Ordering::Relaxed);
    }

    pub(super) fn mark_finished(&self, failed: bool) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.busy.store(false, Ordering::Relaxed);
    }

    fn snapshot(&self, worker_id: &str, label: &str) -> WorkerStats {
        WorkerStats {
            worker_id: worker_id.to_string(),
            label: label.to_string(),
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            busy: self.busy.load(Ordering::Relaxed),
            last_seen: Utc::now(),
        }
    }
}

pub(super) struct HeartbeatConfig {
    pub(super) worker_id: String,
    pub(super) label: String,
    pub(super) interval: Duration,
    pub(super) ttl: Duration,
}

/// Publish heartbeats until `stop` flips, then deregister.
pub(super) async fn run_heartbeat(
    registry: Arc<dyn WorkerRegistry>,
    config: HeartbeatConfig,
    counters: Arc<WorkerCounters>,
    mut stop: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut failure_streak = 0_u32;
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = stop.changed() => break,
        }
        if *stop.borrow() {
            break;
        }
        let stats = counters.snapshot(&config.worker_id, &config.label);
        match registry.heartbeat(&stats, config.ttl).await {
            Ok(()) => {
                failure_streak = 0;
                tracing::trace!(
                    worker_id = %config.worker_id,
                    processed = stats.processed,
                    failed = stats.failed,
                    busy = stats.busy,
                    "worker heartbeat published"
                );
            }
            Err(error) => {
                failure_streak = failure_streak.saturating_add(1);
                if should_surface_repeated_failure(failure_streak) {
                    tracing::warn!(
                        event = ServiceEvent::WorkerHeartbeatFailed.as_str(),
                        worker_id = %config.worker_id,
                        failure_streak,
                        error = %error,
                        "failed to publish worker heartbeat"
                    );
                }
            }
        }
    }

    if let Err(error) = registry.deregister(&config.worker_id).await {
        tracing::warn!(
            event = ServiceEvent::WorkerHeartbeatFailed.as_str(),
            worker_id = %config.worker_id,
            error = %error,
            "failed to deregister worker"
        );
    }
}
