use std::sync::Arc;

use omni_query::{GatewayState, QueueBackend, ServiceConfig, router, run_http, shutdown_signal};

use crate::service_builder::{build_backends, build_dispatcher, build_health};

pub(crate) async fn run_gateway_mode(config: &ServiceConfig) -> anyhow::Result<()> {
    if config.queue.backend == QueueBackend::Memory {
        tracing::warn!(
            "gateway mode with the memory backend has no workers; submitted jobs stay PENDING"
        );
    }
    let backends = build_backends(config)?;
    let state = GatewayState {
        dispatcher: build_dispatcher(&backends),
        health: Arc::new(build_health(config, &backends)?),
    };
    run_http(router(state), &config.gateway.bind, shutdown_signal()).await
}
