use std::sync::Arc;

use async_trait::async_trait;

use crate::health::{Probe, ProbeError};
use crate::jobs::WorkerRegistry;

/// Healthy iff at least one worker has an unexpired heartbeat.
pub struct WorkersProbe {
    name: String,
    registry: Arc<dyn WorkerRegistry>,
}

impl WorkersProbe {
    /// Probe the pool through `registry`.
    pub fn new(name: impl Into<String>, registry: Arc<dyn WorkerRegistry>) -> Self {
        Self {
            name: name.into(),
            registry,
        }
    }
}

#[async_trait]
impl Probe for WorkersProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> Result<(), ProbeError> {
        match self.registry.active_workers().await {
            Ok(workers) if workers.is_empty() => Err(ProbeError::NoActiveWorkers(None)),
            Ok(workers) => {
                tracing::trace!(active = workers.len(), "workers probe found active workers");
                Ok(())
            }
            Err(error) => Err(ProbeError::NoActiveWorkers(Some(error.to_string()))),
        }
    }
}
