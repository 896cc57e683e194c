use std::sync::Arc;
use std::time::Duration;

use omni_answer::{AnsweringCapability, FaultKind};
use tokio::sync::watch;

use crate::error::{QueueError, StoreError};
use crate::jobs::{
    JobError, JobQueue, JobRecord, JobStatus, JobStore, JobTransition, UnitOfWork,
};
use crate::observability::{ServiceEvent, should_surface_repeated_failure};

use super::heartbeat::WorkerCounters;

const QUEUE_RETRY_BACKOFF_MS: u64 = 500;
const MAX_QUEUE_RETRY_BACKOFF_MS: u64 = 30_000;
/// Store writes attempted before a computed outcome is given up.
const MAX_OUTCOME_WRITE_ATTEMPTS: u32 = 5;

pub(super) struct WorkerContext {
    pub(super) worker_id: String,
    pub(super) queue: Arc<dyn JobQueue>,
    pub(super) store: Arc<dyn JobStore>,
    pub(super) capability: Arc<dyn AnsweringCapability>,
    pub(super) job_timeout: Duration,
    pub(super) dequeue_wait: Duration,
    pub(super) counters: Arc<WorkerCounters>,
}

/// Exponential backoff for consecutive queue read failures, capped at 30s.
pub fn compute_retry_backoff_ms(base_ms: u64, failure_streak: u32) -> u64 {
    if failure_streak <= 1 {
        return base_ms.max(1);
    }
    let shift = failure_streak.saturating_sub(1).min(12);
    base_ms
        .max(1)
        .saturating_mul(1u64 << shift)
        .min(MAX_QUEUE_RETRY_BACKOFF_MS)
}

fn shutdown_requested(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow() || shutdown.has_changed().is_err()
}

pub(super) async fn run_worker(context: WorkerContext, mut shutdown: watch::Receiver<bool>) {
    tracing::info!(
        event = ServiceEvent::WorkerStarted.as_str(),
        worker_id = %context.worker_id,
        "worker started"
    );
    let mut read_failure_streak = 0_u32;
    while !shutdown_requested(&shutdown) {
        match context.queue.dequeue(context.dequeue_wait).await {
            Ok(Some(unit)) => {
                read_failure_streak = 0;
                context.process(unit, &mut shutdown).await;
            }
            Ok(None) => {
                read_failure_streak = 0;
            }
            Err(QueueError::Closed) => {
                tracing::info!(
                    worker_id = %context.worker_id,
                    "job queue closed; worker exiting"
                );
                break;
            }
            Err(QueueError::Malformed(detail)) => {
                read_failure_streak = 0;
                tracing::warn!(
                    event = ServiceEvent::JobSkipped.as_str(),
                    worker_id = %context.worker_id,
                    error = %detail,
                    "dropped undecodable unit of work"
                );
            }
            Err(error) => {
                read_failure_streak = read_failure_streak.saturating_add(1);
                let retry_backoff_ms =
                    compute_retry_backoff_ms(QUEUE_RETRY_BACKOFF_MS, read_failure_streak);
                if should_surface_repeated_failure(read_failure_streak) {
                    tracing::warn!(
                        event = ServiceEvent::QueueReadFailed.as_str(),
                        worker_id = %context.worker_id,
                        failure_streak = read_failure_streak,
                        retry_backoff_ms,
                        error = %error,
                        "failed to read from job queue; retrying"
                    );
                } else {
                    tracing::trace!(
                        event = ServiceEvent::QueueReadFailed.as_str(),
                        worker_id = %context.worker_id,
                        failure_streak = read_failure_streak,
                        retry_backoff_ms,
                        error = %error,
                        "failed to read from job queue; retrying"
                    );
                }
                tokio::select! {
                    () = tokio::time::sleep(Duration::from_millis(retry_backoff_ms)) => {}
                    _ = shutdown.changed() => {}
                }
            }
        }
    }
    tracing::info!(
        event = ServiceEvent::WorkerStopped.as_str(),
        worker_id = %context.worker_id,
        "worker stopped"
    );
}

impl WorkerContext {
    async fn process(&self, unit: UnitOfWork, shutdown: &mut watch::Receiver<bool>) {
        match self.store.transition(&unit.job_id, JobTransition::Start).await {
            Ok(_) => {}
            Err(StoreError::NotFound(_) | StoreError::Transition(_)) => {
                tracing::warn!(
                    event = ServiceEvent::JobSkipped.as_str(),
                    worker_id = %self.worker_id,
                    job_id = %unit.job_id,
                    "unit references an unknown or already started job; skipping"
                );
                return;
            }
            Err(error) => {
                tracing::warn!(
                    event = ServiceEvent::JobStoreWriteFailed.as_str(),
                    worker_id = %self.worker_id,
                    job_id = %unit.job_id,
                    error = %error,
                    "failed to mark job running; skipping"
                );
                return;
            }
        }

        self.counters.mark_busy();
        tracing::info!(
            event = ServiceEvent::JobStarted.as_str(),
            worker_id = %self.worker_id,
            job_id = %unit.job_id,
            use_web_search = unit.use_web_search,
            "job started"
        );

        let transition = match self.execute(&unit).await {
            Ok(text) => JobTransition::Succeed(text),
            Err(error) => JobTransition::Fail(error),
        };
        let failed = transition.target() == JobStatus::Failed;

        match self.record_outcome(&unit.job_id, transition, shutdown).await {
            Ok(record) => match record.error {
                None => tracing::info!(
                    event = ServiceEvent::JobSucceeded.as_str(),
                    worker_id = %self.worker_id,
                    job_id = %unit.job_id,
                    "job succeeded"
                ),
                Some(error) => tracing::warn!(
                    event = ServiceEvent::JobFailed.as_str(),
                    worker_id = %self.worker_id,
                    job_id = %unit.job_id,
                    kind = %error.kind,
                    retryable = error.retryable,
                    error = %error.message,
                    "job failed"
                ),
            },
            Err(error) => {
                tracing::warn!(
                    event = ServiceEvent::JobStoreWriteFailed.as_str(),
                    worker_id = %self.worker_id,
                    job_id = %unit.job_id,
                    error = %error,
                    "failed to record job outcome; giving up"
                );
            }
        }
        self.counters.mark_finished(failed);
    }

    /// Write a terminal transition, retrying backend failures with backoff.
    ///
    /// Once shutdown is requested the remaining attempts run without sleeping.
    async fn record_outcome(
        &self,
        job_id: &str,
        transition: JobTransition,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<JobRecord, StoreError> {
        let target = transition.target();
        let mut attempt = 0_u32;
        loop {
            attempt = attempt.saturating_add(1);
            let error = match self.store.transition(job_id, transition.clone()).await {
                Ok(record) => return Ok(record),
                Err(StoreError::Transition(rejected)) if attempt > 1 => {
                    // An earlier attempt may have landed before its failure was reported.
                    return match self.store.get(job_id).await? {
                        Some(record) if record.status == target => Ok(record),
                        _ => Err(StoreError::Transition(rejected)),
                    };
                }
                Err(error @ (StoreError::NotFound(_) | StoreError::Transition(_))) => {
                    return Err(error);
                }
                Err(error) => error,
            };
            if attempt >= MAX_OUTCOME_WRITE_ATTEMPTS {
                return Err(error);
            }
            let retry_backoff_ms = compute_retry_backoff_ms(QUEUE_RETRY_BACKOFF_MS, attempt);
            tracing::warn!(
                event = ServiceEvent::JobStoreWriteFailed.as_str(),
                worker_id = %self.worker_id,
                job_id,
                attempt,
                retry_backoff_ms,
                error = %error,
                "failed to record job outcome; retrying"
            );
            if !shutdown_requested(shutdown) {
                tokio::select! {
                    () = tokio::time::sleep(Duration::from_millis(retry_backoff_ms)) => {}
                    _ = shutdown.changed() => {}
                }
            }
        }
    }

    /// Run the capability on its own task so a panic or timeout becomes a job error.
    async fn execute(&self, unit: &UnitOfWork) -> Result<String, JobError> {
        let capability = Arc::clone(&self.capability);
        let query = unit.query.clone();
        let use_web_search = unit.use_web_search;
        let mut handle =
            tokio::spawn(async move { capability.answer(&query, use_web_search).await });

        match tokio::time::timeout(self.job_timeout, &mut handle).await {
            Ok(Ok(Ok(text))) => Ok(text),
            Ok(Ok(Err(error))) => Err(JobError::from(&error)),
            Ok(Err(join_error)) => Err(JobError::new(
                FaultKind::CapabilityUnavailable,
                format!("answering task aborted: {join_error}"),
            )),
            Err(_) => {
                handle.abort();
                Err(JobError::timed_out(self.job_timeout))
            }
        }
    }
}
