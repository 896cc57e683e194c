use anyhow::Context;
use omni_query::ServiceConfig;

use crate::service_builder::{build_backends, build_health};

/// Returns whether every component is healthy.
pub(crate) async fn run_health_mode(config: &ServiceConfig) -> anyhow::Result<bool> {
    let backends = build_backends(config)?;
    let aggregator = build_health(config, &backends)?;
    let report = aggregator.check_health().await;
    let rendered =
        serde_json::to_string_pretty(&report).context("failed to render health report")?;
    println!("{rendered}");
    Ok(report.is_healthy())
}
