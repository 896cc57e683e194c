//! Job model, durable queue, job store, worker registry, dispatcher and execution pool.

mod dispatcher;
mod pool;
mod queue;
mod record;
mod registry;
mod store;
mod unit;

pub use dispatcher::JobDispatcher;
pub use pool::{ExecutionPool, PoolConfig, compute_retry_backoff_ms};
pub use queue::{JobQueue, MemoryJobQueue, ValkeyJobQueue};
pub use record::{JobError, JobRecord, JobStatus, JobTransition, TransitionError};
pub use registry::{MemoryWorkerRegistry, ValkeyWorkerRegistry, WorkerRegistry, WorkerStats};
pub use store::{JobStore, MemoryJobStore, ValkeyJobStore};
pub use unit::UnitOfWork;
