use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinError;
use tokio::time::error::Elapsed;

/// One named dependency check.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Stable component key in the health report.
    fn name(&self) -> &str;

    /// Per-probe timeout override; `None` uses the probe set default.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Perform one check. Retries are not performed.
    async fn check(&self) -> Result<(), ProbeError>;
}

/// Why a dependency is considered unhealthy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// The probe did not finish within its timeout.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// An HTTP dependency answered outside 2xx.
    #[error("HTTP {0}")]
    HttpStatus(u16),

    /// No worker reported in (optionally because inspection failed).
    #[error("{}", no_active_workers_message(.0.as_deref()))]
    NoActiveWorkers(Option<String>),

    /// The dependency could not be reached or refused the operation.
    #[error("{0}")]
    Unreachable(String),

    /// The dependency answered with something other than the expected reply.
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),

    /// The dependency has no configured endpoint.
    #[error("{0}")]
    NotConfigured(String),

    /// The probe task panicked or was cancelled.
    #[error("probe aborted: {0}")]
    Aborted(String),
}

fn no_active_workers_message(detail: Option<&str>) -> String {
    match detail {
        Some(detail) => format!("no active workers ({detail})"),
        None => "no active workers".to_string(),
    }
}

/// Fold a timeout-wrapped, task-isolated probe run into a single outcome.
pub fn classify_probe_result(
    result: Result<Result<Result<(), ProbeError>, JoinError>, Elapsed>,
    timeout: Duration,
) -> Result<(), ProbeError> {
    match result {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(join_error)) => Err(ProbeError::Aborted(join_error.to_string())),
        Err(_) => Err(ProbeError::Timeout(timeout)),
    }
}
