use omni_query::{QueueBackend, ServiceConfig, shutdown_signal};

use crate::service_builder::{build_backends, start_pool};

pub(crate) async fn run_worker_mode(config: &ServiceConfig) -> anyhow::Result<()> {
    if config.queue.backend == QueueBackend::Memory {
        anyhow::bail!(
            "worker mode needs the valkey backend; set VALKEY_URL or use `serve` for a single process"
        );
    }
    let backends = build_backends(config)?;
    let pool = start_pool(config, &backends);
    tracing::info!(workers = ?pool.worker_ids(), "worker mode running (Ctrl+C/SIGTERM to stop)");
    shutdown_signal().await;
    tracing::info!("shutdown requested; waiting for in-flight jobs");
    pool.shutdown().await;
    Ok(())
}
