use std::sync::Arc;

use anyhow::{Context, Result};
use omni_answer::{AnsweringCapability, Summarizer};
use omni_query::{
    BROKER_PROBE, BrokerProbe, ExecutionPool, HealthAggregator, JobDispatcher, JobQueue, JobStore,
    MemoryJobQueue, MemoryJobStore, MemoryWorkerRegistry, ProbeSet, QueueBackend, ServiceConfig,
    ValkeyJobQueue, ValkeyJobStore, ValkeyWorkerRegistry, WorkerRegistry,
};

/// Queue, store and registry for the configured backend, plus the matching broker probe.
pub(crate) struct Backends {
    pub(crate) queue: Arc<dyn JobQueue>,
    pub(crate) store: Arc<dyn JobStore>,
    pub(crate) registry: Arc<dyn WorkerRegistry>,
    broker_probe: BrokerProbe,
}

pub(crate) fn build_backends(config: &ServiceConfig) -> Result<Backends> {
    let queue_config = &config.queue;
    match (queue_config.backend, queue_config.url.as_deref()) {
        (QueueBackend::Valkey, Some(url)) => {
            let queue = ValkeyJobQueue::new(url, &queue_config.key_prefix)
                .context("failed to open valkey job queue")?;
            let store = ValkeyJobStore::new(
                url,
                &queue_config.key_prefix,
                queue_config.result_ttl_secs,
            )
            .context("failed to open valkey job store")?;
            let registry = ValkeyWorkerRegistry::new(url, &queue_config.key_prefix)
                .context("failed to open valkey worker registry")?;
            tracing::info!(
                backend = QueueBackend::Valkey.as_str(),
                key_prefix = %queue_config.key_prefix,
                "job backends ready"
            );
            Ok(Backends {
                queue: Arc::new(queue),
                store: Arc::new(store),
                registry: Arc::new(registry),
                broker_probe: BrokerProbe::valkey(BROKER_PROBE, url),
            })
        }
        (QueueBackend::Valkey, None) => {
            anyhow::bail!("queue backend `valkey` requires a broker URL")
        }
        (QueueBackend::Memory, _) => {
            let queue = Arc::new(MemoryJobQueue::new(queue_config.memory_capacity));
            tracing::info!(
                backend = QueueBackend::Memory.as_str(),
                capacity = queue_config.memory_capacity,
                "job backends ready (single process)"
            );
            Ok(Backends {
                queue: Arc::clone(&queue) as Arc<dyn JobQueue>,
                store: Arc::new(MemoryJobStore::new()),
                registry: Arc::new(MemoryWorkerRegistry::new()),
                broker_probe: BrokerProbe::in_process(BROKER_PROBE, queue),
            })
        }
    }
}

pub(crate) fn build_dispatcher(backends: &Backends) -> JobDispatcher {
    JobDispatcher::new(Arc::clone(&backends.queue), Arc::clone(&backends.store))
}

pub(crate) fn build_health(config: &ServiceConfig, backends: &Backends) -> Result<HealthAggregator> {
    let probes = ProbeSet::from_config(
        config,
        backends.broker_probe.clone(),
        Arc::clone(&backends.registry),
    )
    .context("failed to build probe set")?;
    tracing::debug!(probes = ?probes.names(), "probe set ready");
    Ok(HealthAggregator::new(probes))
}

pub(crate) fn start_pool(config: &ServiceConfig, backends: &Backends) -> ExecutionPool {
    let capability: Arc<dyn AnsweringCapability> =
        Arc::new(Summarizer::from_config(&config.answer));
    ExecutionPool::start(
        config.pool.clone(),
        Arc::clone(&backends.queue),
        Arc::clone(&backends.store),
        capability,
        Arc::clone(&backends.registry),
    )
}
