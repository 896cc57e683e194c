//! Error types for dispatch, queue, store and worker-registry operations.
//!
//! Follows ODF-REP: library modules expose explicit `thiserror` enums;
//! application wiring (binary, node runners) wraps them with `anyhow` context.

use thiserror::Error;

use crate::jobs::TransitionError;

/// Durable queue failures.
#[derive(Error, Debug)]
pub enum QueueError {
    /// The queue has been closed and accepts no more work.
    #[error("job queue is closed")]
    Closed,

    /// The backing broker failed or is unreachable.
    #[error("job queue backend error: {0}")]
    Backend(String),

    /// A dequeued payload could not be decoded into a unit of work.
    #[error("malformed unit of work: {0}")]
    Malformed(String),
}

/// Job store failures.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing store failed or is unreachable.
    #[error("job store backend error: {0}")]
    Backend(String),

    /// A stored record could not be decoded.
    #[error("malformed job record {job_id}: {message}")]
    Malformed {
        /// Record id.
        job_id: String,
        /// Decode detail.
        message: String,
    },

    /// A record with this id already exists.
    #[error("job record {0} already exists")]
    Duplicate(String),

    /// No record with this id exists (or it expired).
    #[error("job record {0} not found")]
    NotFound(String),

    /// The requested status change would regress the record.
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Worker registry failures.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The backing store failed or is unreachable.
    #[error("worker registry backend error: {0}")]
    Backend(String),

    /// A heartbeat payload could not be decoded.
    #[error("malformed worker heartbeat {worker_id}: {message}")]
    Malformed {
        /// Worker id.
        worker_id: String,
        /// Decode detail.
        message: String,
    },
}

/// Submission and lookup failures surfaced to API callers.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The query is missing or blank after trimming.
    #[error("Query is required")]
    InvalidInput,

    /// The record could not be created or the unit could not be enqueued.
    #[error("task queue unavailable: {0}")]
    DispatchUnavailable(String),

    /// A status lookup failed at the store.
    #[error("job lookup failed: {0}")]
    Lookup(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobStatus;

    #[test]
    fn invalid_input_message_matches_api_contract() {
        assert_eq!(DispatchError::InvalidInput.to_string(), "Query is required");
    }

    #[test]
    fn transition_errors_convert_into_store_errors() {
        let error: StoreError = TransitionError {
            job_id: "job-1".to_string(),
            from: JobStatus::Succeeded,
            to: JobStatus::Running,
        }
        .into();
        assert!(matches!(error, StoreError::Transition(_)));
        assert!(error.to_string().contains("SUCCEEDED -> RUNNING"));
    }
}
