//! Gateway namespace: HTTP entrypoint.

mod http;

pub use http::{
    ErrorResponse, GatewayState, QUERY_REQUIRED, QueryRequest, SubmitResponse, TASK_NOT_FOUND,
    TASK_QUEUE_UNAVAILABLE, TaskStatusResponse, router, run_http, shutdown_signal,
    validate_query_request,
};
