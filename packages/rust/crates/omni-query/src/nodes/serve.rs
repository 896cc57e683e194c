use std::sync::Arc;

use omni_query::{GatewayState, ServiceConfig, router, run_http, shutdown_signal};

use crate::service_builder::{build_backends, build_dispatcher, build_health, start_pool};

pub(crate) async fn run_serve_mode(config: &ServiceConfig) -> anyhow::Result<()> {
    let backends = build_backends(config)?;
    let state = GatewayState {
        dispatcher: build_dispatcher(&backends),
        health: Arc::new(build_health(config, &backends)?),
    };
    let pool = start_pool(config, &backends);
    let served = run_http(router(state), &config.gateway.bind, shutdown_signal()).await;
    pool.shutdown().await;
    served
}
