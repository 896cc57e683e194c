//! Job record model and the single transition function that guards it.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use omni_answer::{AnswerError, FaultKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle state of one dispatched job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Created and enqueued; no worker has picked it up.
    Pending,
    /// A worker is executing it.
    Running,
    /// Finished with a result.
    Succeeded,
    /// Finished with a classified error.
    Failed,
}

impl JobStatus {
    /// Wire name (matches the serde representation).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
        }
    }

    /// Whether no further transition is allowed.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Monotonic order: PENDING -> RUNNING -> {SUCCEEDED | FAILED}.
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Running, Self::Succeeded)
                | (Self::Running, Self::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error recorded on a FAILED job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobError {
    /// Fault classification.
    pub kind: FaultKind,
    /// Human-readable detail.
    pub message: String,
    /// Whether re-submitting the same query may succeed.
    pub retryable: bool,
}

impl JobError {
    /// Build an error whose `retryable` flag follows the fault kind.
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: kind.is_retryable(),
        }
    }

    /// Error recorded when the per-job execution timeout expires.
    pub fn timed_out(timeout: Duration) -> Self {
        Self::new(
            FaultKind::UpstreamTimeout,
            format!("job timed out after {}s", timeout.as_secs()),
        )
    }
}

impl From<&AnswerError> for JobError {
    fn from(error: &AnswerError) -> Self {
        Self::new(error.kind(), error.to_string())
    }
}

/// Durable state of one dispatched unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Opaque identifier (UUID v4), the sole external handle.
    pub id: String,
    /// Input text.
    pub query: String,
    /// Whether the answer should be augmented with web search.
    pub use_web_search: bool,
    /// Current lifecycle state.
    pub status: JobStatus,
    /// Summary text; set only on SUCCEEDED.
    pub result: Option<String>,
    /// Classified error; set only on FAILED.
    pub error: Option<JobError>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time a worker marked it RUNNING.
    pub started_at: Option<DateTime<Utc>>,
    /// Time it reached a terminal state.
    pub finished_at: Option<DateTime<Utc>>,
}

/// A requested status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobTransition {
    /// PENDING -> RUNNING.
    Start,
    /// RUNNING -> SUCCEEDED with the produced text.
    Succeed(String),
    /// RUNNING -> FAILED with a classified error.
    Fail(JobError),
}

impl JobTransition {
    /// Status the record ends in after this transition.
    pub const fn target(&self) -> JobStatus {
        match self {
            Self::Start => JobStatus::Running,
            Self::Succeed(_) => JobStatus::Succeeded,
            Self::Fail(_) => JobStatus::Failed,
        }
    }
}

/// Rejected status change.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("job {job_id}: illegal transition {from} -> {to}")]
pub struct TransitionError {
    /// Record id.
    pub job_id: String,
    /// Status the record was in.
    pub from: JobStatus,
    /// Status that was requested.
    pub to: JobStatus,
}

impl JobRecord {
    /// New PENDING record.
    pub fn pending(id: impl Into<String>, query: impl Into<String>, use_web_search: bool) -> Self {
        Self {
            id: id.into(),
            query: query.into(),
            use_web_search,
            status: JobStatus::Pending,
            result: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Apply `transition` stamped with the current time.
    pub fn apply(&mut self, transition: JobTransition) -> Result<(), TransitionError> {
        self.apply_at(transition, Utc::now())
    }

    /// Apply `transition` stamped with `now`; the record is untouched on error.
    pub fn apply_at(
        &mut self,
        transition: JobTransition,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        let target = transition.target();
        if !self.status.can_transition_to(target) {
            return Err(TransitionError {
                job_id: self.id.clone(),
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        match transition {
            JobTransition::Start => {
                self.started_at = Some(now);
            }
            JobTransition::Succeed(result) => {
                self.result = Some(result);
                self.error = None;
                self.finished_at = Some(now);
            }
            JobTransition::Fail(error) => {
                self.result = None;
                self.error = Some(error);
                self.finished_at = Some(now);
            }
        }
        Ok(())
    }
}
