//! HTTP gateway: query submission, status polling and health.
//!
//! `POST /api/v1/query/` answers 202 with a task id (400 on a missing or
//! blank query, 503 when the queue cannot take work). `GET
//! /api/v1/query/{task_id}/` polls one job. `GET /api/v1/health/` runs one
//! health aggregation and answers 200 or 503. Every route also matches
//! without its trailing slash.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use crate::error::DispatchError;
use crate::health::HealthAggregator;
use crate::jobs::{JobDispatcher, JobError, JobRecord, JobStatus};

/// Error body for a missing or blank query.
pub const QUERY_REQUIRED: &str = "Query is required";
/// Error body when the job cannot be dispatched.
pub const TASK_QUEUE_UNAVAILABLE: &str = "Task queue unavailable";
/// Error body for an unknown task id.
pub const TASK_NOT_FOUND: &str = "Task not found";

/// Request body for `POST /api/v1/query/`.
#[derive(Debug, Default, Deserialize)]
pub struct QueryRequest {
    /// Query text; required and non-blank.
    #[serde(default)]
    pub query: Option<String>,
    /// Augment with web search (default false).
    #[serde(default)]
    pub use_web_search: Option<bool>,
}

/// `202` body.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    /// Job id for polling.
    pub task_id: String,
}

/// Error body for every non-2xx gateway answer.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable message.
    pub error: String,
}

/// `200` body of the status endpoint.
#[derive(Debug, Serialize)]
pub struct TaskStatusResponse {
    pub task_id: String,
    pub status: JobStatus,
    pub result: Option<String>,
    pub error: Option<JobError>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl From<JobRecord> for TaskStatusResponse {
    fn from(record: JobRecord) -> Self {
        Self {
            task_id: record.id,
            status: record.status,
            result: record.result,
            error: record.error,
            created_at: record.created_at,
            started_at: record.started_at,
            finished_at: record.finished_at,
        }
    }
}

/// Shared state for the HTTP server.
#[derive(Clone)]
pub struct GatewayState {
    pub dispatcher: JobDispatcher,
    pub health: Arc<HealthAggregator>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

/// Validate the submission body; returns the query as sent and the web-search flag.
pub fn validate_query_request(body: &QueryRequest) -> Result<(String, bool), ApiError> {
    let query = body.query.as_deref().unwrap_or_default();
    if query.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, QUERY_REQUIRED));
    }
    Ok((query.to_string(), body.use_web_search.unwrap_or(false)))
}

async fn handle_submit(
    State(state): State<GatewayState>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let Json(body) = body.map_err(|rejection| {
        tracing::debug!(error = %rejection, "rejected query body");
        api_error(StatusCode::BAD_REQUEST, QUERY_REQUIRED)
    })?;
    let (query, use_web_search) = validate_query_request(&body)?;
    match state.dispatcher.submit(&query, use_web_search).await {
        Ok(task_id) => Ok((StatusCode::ACCEPTED, Json(SubmitResponse { task_id }))),
        Err(DispatchError::InvalidInput) => {
            Err(api_error(StatusCode::BAD_REQUEST, QUERY_REQUIRED))
        }
        Err(error) => {
            tracing::warn!(error = %error, "query submission failed");
            Err(api_error(
                StatusCode::SERVICE_UNAVAILABLE,
                TASK_QUEUE_UNAVAILABLE,
            ))
        }
    }
}

async fn handle_status(
    State(state): State<GatewayState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskStatusResponse>, ApiError> {
    match state.dispatcher.get_status(&task_id).await {
        Ok(Some(record)) => Ok(Json(record.into())),
        Ok(None) => Err(api_error(StatusCode::NOT_FOUND, TASK_NOT_FOUND)),
        Err(error) => {
            tracing::warn!(task_id = %task_id, error = %error, "task status lookup failed");
            Err(api_error(
                StatusCode::SERVICE_UNAVAILABLE,
                TASK_QUEUE_UNAVAILABLE,
            ))
        }
    }
}

async fn handle_health(State(state): State<GatewayState>) -> Response {
    let report = state.health.check_health().await;
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report)).into_response()
}

/// Build the gateway router.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/api/v1/query/", post(handle_submit))
        .route("/api/v1/query", post(handle_submit))
        .route("/api/v1/query/{task_id}/", get(handle_status))
        .route("/api/v1/query/{task_id}", get(handle_status))
        .route("/api/v1/health/", get(handle_health))
        .route("/api/v1/health", get(handle_health))
        .with_state(state)
}

/// Serve `app` on `bind_addr` until `shutdown` resolves; in-flight requests complete before return.
pub async fn run_http<F>(app: Router, bind_addr: &str, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind gateway on {bind_addr}"))?;
    tracing::info!("gateway listening on {bind_addr} (Ctrl+C/SIGTERM to stop)");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("gateway server failed")?;
    tracing::info!("gateway stopped");
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(error) => {
                tracing::warn!("failed to listen for SIGTERM: {error}");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for Ctrl+C: {error}");
        }
    }
}
