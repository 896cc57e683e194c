//! Error types for answering-capability calls.
//!
//! Follows ODF-REP: library crates use `thiserror` for explicit error enums.
//! Every variant maps onto a [`FaultKind`] so callers can tell retryable
//! upstream trouble apart from terminal faults without parsing messages.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum upstream body characters kept in an error message.
const MAX_BODY_PREVIEW_CHARS: usize = 240;

/// Stable classification of an answering fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// Provider unreachable, overloaded (429/5xx) or not configured.
    CapabilityUnavailable,
    /// Provider did not answer in time.
    UpstreamTimeout,
    /// Provider answered with a body we could not interpret.
    MalformedResponse,
    /// Provider refused the request (4xx other than 429).
    UpstreamRejected,
}

impl FaultKind {
    /// Whether re-submitting the same query may succeed.
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::CapabilityUnavailable | Self::UpstreamTimeout)
    }

    /// Wire name (matches the serde representation).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CapabilityUnavailable => "capability_unavailable",
            Self::UpstreamTimeout => "upstream_timeout",
            Self::MalformedResponse => "malformed_response",
            Self::UpstreamRejected => "upstream_rejected",
        }
    }
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while producing an answer.
#[derive(Error, Debug)]
pub enum AnswerError {
    /// Upstream could not be reached or is temporarily overloaded.
    #[error("{upstream} unavailable: {message}")]
    Unavailable {
        /// Upstream label (`llm`, `web_search`).
        upstream: &'static str,
        /// Transport or status detail.
        message: String,
    },

    /// Upstream request exceeded its deadline.
    #[error("{upstream} timed out: {message}")]
    Timeout {
        /// Upstream label.
        upstream: &'static str,
        /// Transport detail.
        message: String,
    },

    /// Upstream body could not be decoded into the expected shape.
    #[error("{upstream} returned a malformed response: {message}")]
    MalformedResponse {
        /// Upstream label.
        upstream: &'static str,
        /// Decode detail.
        message: String,
    },

    /// Upstream rejected the request outright.
    #[error("{upstream} rejected the request (HTTP {status}): {body}")]
    Rejected {
        /// Upstream label.
        upstream: &'static str,
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        body: String,
    },

    /// The capability is missing configuration required for this request.
    #[error("{0}")]
    NotConfigured(String),
}

impl AnswerError {
    /// Classification of this fault.
    pub const fn kind(&self) -> FaultKind {
        match self {
            Self::Unavailable { .. } | Self::NotConfigured(_) => FaultKind::CapabilityUnavailable,
            Self::Timeout { .. } => FaultKind::UpstreamTimeout,
            Self::MalformedResponse { .. } => FaultKind::MalformedResponse,
            Self::Rejected { .. } => FaultKind::UpstreamRejected,
        }
    }

    /// Shortcut for `self.kind().is_retryable()`.
    pub const fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    pub(crate) fn from_transport(upstream: &'static str, error: &reqwest::Error) -> Self {
        let message = error.to_string();
        if error.is_timeout() {
            Self::Timeout { upstream, message }
        } else if error.is_decode() {
            Self::MalformedResponse { upstream, message }
        } else {
            Self::Unavailable { upstream, message }
        }
    }

    pub(crate) fn from_status(
        upstream: &'static str,
        status: reqwest::StatusCode,
        body: &str,
    ) -> Self {
        let body = preview(body);
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            Self::Unavailable {
                upstream,
                message: format!("HTTP {}: {body}", status.as_u16()),
            }
        } else {
            Self::Rejected {
                upstream,
                status: status.as_u16(),
                body,
            }
        }
    }

    pub(crate) fn malformed(upstream: &'static str, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            upstream,
            message: message.into(),
        }
    }
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(MAX_BODY_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
