//! Durable queue of units of work.

mod memory;
mod valkey;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::QueueError;
use crate::jobs::UnitOfWork;

pub use memory::MemoryJobQueue;
pub use valkey::ValkeyJobQueue;

/// At-most-once queue shared by the dispatcher (producer) and the execution pool (consumers).
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Append one unit; returns once it is durably accepted.
    async fn enqueue(&self, unit: &UnitOfWork) -> Result<(), QueueError>;

    /// Remove and return the next unit, waiting at most `wait` for one to arrive.
    ///
    /// `Ok(None)` means the wait elapsed with an empty queue. Removal is atomic,
    /// so a unit is delivered to at most one caller.
    async fn dequeue(&self, wait: Duration) -> Result<Option<UnitOfWork>, QueueError>;
}
