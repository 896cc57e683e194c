//! omni-query: asynchronous query answering plus dependency health aggregation.
//!
//! - **Dispatch**: a submission becomes a PENDING [`JobRecord`] and one
//!   [`UnitOfWork`] on a durable queue; the caller gets the job id back at once.
//! - **Execution**: an [`ExecutionPool`] of workers drains the queue, runs the
//!   answering capability and records SUCCEEDED or FAILED.
//! - **Health**: a [`HealthAggregator`] runs every registered [`Probe`] with
//!   failure isolation and folds the results into one [`HealthReport`].

#![allow(missing_docs)]

mod config;
mod error;
mod gateway;
mod health;
mod jobs;
mod observability;
mod valkey;

pub use config::{
    ConfigError, ConfigOverrides, DEFAULT_BIND_ADDR, DEFAULT_KEY_PREFIX,
    DEFAULT_MEMORY_QUEUE_CAPACITY, DEFAULT_PROBE_TIMEOUT_SECS, DEFAULT_RESULT_TTL_SECS,
    DatabaseSettings, EnvLookup, GatewayConfig, GatewaySettings, HealthConfig, HealthSettings,
    LlmSettings, QueueBackend, QueueConfig, QueueSettings, RuntimeSettings, SearchSettings,
    ServiceConfig, WorkerSettings, load_runtime_settings, load_runtime_settings_from_paths,
    runtime_settings_paths, set_config_home_override,
};
pub use error::{DispatchError, QueueError, RegistryError, StoreError};
pub use gateway::{
    ErrorResponse, GatewayState, QUERY_REQUIRED, QueryRequest, SubmitResponse, TASK_NOT_FOUND,
    TASK_QUEUE_UNAVAILABLE, TaskStatusResponse, router, run_http, shutdown_signal,
    validate_query_request,
};
pub use health::{
    BROKER_PROBE, BrokerProbe, DATABASE_PROBE, DatabaseProbe, DuplicateProbeError,
    EXTERNAL_API_A_PROBE, EXTERNAL_API_B_PROBE, HealthAggregator, HealthReport, HealthStatus,
    HttpApiProbe, Probe, ProbeError, ProbeResult, ProbeSet, WORKERS_PROBE, WorkersProbe,
    classify_probe_result,
};
pub use jobs::{
    ExecutionPool, JobDispatcher, JobError, JobQueue, JobRecord, JobStatus, JobStore,
    JobTransition, MemoryJobQueue, MemoryJobStore, MemoryWorkerRegistry, PoolConfig,
    TransitionError, UnitOfWork, ValkeyJobQueue, ValkeyJobStore, ValkeyWorkerRegistry,
    WorkerRegistry, WorkerStats, compute_retry_backoff_ms,
};
pub use observability::ServiceEvent;
