//! Stable structured-log event names.
//!
//! Every dispatch, worker, heartbeat and probe log line carries
//! `event = ServiceEvent::X.as_str()` so log pipelines can filter on a fixed key.

/// Structured event identifiers emitted by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceEvent {
    /// A query was accepted and enqueued.
    JobSubmitted,
    /// Enqueue failed; the freshly created record was discarded.
    JobDispatchFailed,
    /// A worker picked up a unit of work.
    JobStarted,
    /// A job reached SUCCEEDED.
    JobSucceeded,
    /// A job reached FAILED.
    JobFailed,
    /// A unit referenced an unknown or already-finished job.
    JobSkipped,
    /// A job record write failed or was rejected.
    JobStoreWriteFailed,
    /// Dequeue failed; the worker backs off.
    QueueReadFailed,
    /// A worker loop started.
    WorkerStarted,
    /// A worker loop exited.
    WorkerStopped,
    /// Worker heartbeat could not be published.
    WorkerHeartbeatFailed,
    /// A probe reported an unhealthy component.
    ProbeUnhealthy,
    /// An aggregation run finished.
    HealthChecked,
    /// Valkey connection established.
    ValkeyConnected,
    /// A Valkey command succeeded on its retry attempt.
    ValkeyCommandRetrySucceeded,
    /// A Valkey command attempt failed.
    ValkeyCommandRetryFailed,
}

impl ServiceEvent {
    /// Stable dotted name used as the `event` field.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::JobSubmitted => "query.job.submitted",
            Self::JobDispatchFailed => "query.job.dispatch_failed",
            Self::JobStarted => "query.job.started",
            Self::JobSucceeded => "query.job.succeeded",
            Self::JobFailed => "query.job.failed",
            Self::JobSkipped => "query.job.skipped",
            Self::JobStoreWriteFailed => "query.job.store_write_failed",
            Self::QueueReadFailed => "query.queue.read_failed",
            Self::WorkerStarted => "query.worker.started",
            Self::WorkerStopped => "query.worker.stopped",
            Self::WorkerHeartbeatFailed => "query.worker.heartbeat_failed",
            Self::ProbeUnhealthy => "query.health.probe_unhealthy",
            Self::HealthChecked => "query.health.checked",
            Self::ValkeyConnected => "query.valkey.connected",
            Self::ValkeyCommandRetrySucceeded => "query.valkey.command.retry_succeeded",
            Self::ValkeyCommandRetryFailed => "query.valkey.command.retry_failed",
        }
    }
}

const REPEATED_FAILURE_LOG_EVERY: u32 = 20;

/// Whether the `failure_streak`-th consecutive failure should be logged at warn level.
pub(crate) fn should_surface_repeated_failure(failure_streak: u32) -> bool {
    matches!(failure_streak, 1 | 2 | 4 | 8 | 16)
        || failure_streak.is_multiple_of(REPEATED_FAILURE_LOG_EVERY)
}
