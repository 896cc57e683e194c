use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use crate::observability::ServiceEvent;

use super::probe::{Probe, classify_probe_result};
use super::probes::ProbeSet;
use super::report::{HealthReport, ProbeResult};

/// Runs every registered probe with failure isolation and folds the results.
pub struct HealthAggregator {
    probes: ProbeSet,
}

impl HealthAggregator {
    /// Aggregator over a fixed probe set.
    pub fn new(probes: ProbeSet) -> Self {
        Self { probes }
    }

    /// Registered component names, in registration order.
    pub fn probe_names(&self) -> Vec<&str> {
        self.probes.names()
    }

    /// Run all probes concurrently; never fails.
    ///
    /// Every probe runs on its own task under its own timeout, so an error,
    /// timeout or panic in one probe only marks that component unhealthy.
    pub async fn check_health(&self) -> HealthReport {
        let runs = self
            .probes
            .entries()
            .map(|(probe, timeout)| run_bounded(Arc::clone(probe), timeout));
        let results = join_all(runs).await;

        for result in results.iter().filter(|result| !result.healthy) {
            tracing::warn!(
                event = ServiceEvent::ProbeUnhealthy.as_str(),
                probe = %result.name,
                error = result.error.as_deref().unwrap_or_default(),
                "dependency probe unhealthy"
            );
        }
        let report = HealthReport::from_results(results);
        tracing::debug!(
            event = ServiceEvent::HealthChecked.as_str(),
            healthy = report.is_healthy(),
            components = report.len(),
            "health check finished"
        );
        report
    }
}

async fn run_bounded(probe: Arc<dyn Probe>, timeout: Duration) -> ProbeResult {
    let name = probe.name().to_string();
    let mut task = tokio::spawn(async move { probe.check().await });
    let result = tokio::time::timeout(timeout, &mut task).await;
    if result.is_err() {
        task.abort();
    }
    ProbeResult::from_outcome(name, classify_probe_result(result, timeout))
}
