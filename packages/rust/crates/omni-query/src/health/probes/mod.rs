//! Concrete dependency probes and the registry that holds them.

mod broker;
mod database;
mod http_api;
mod workers;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use thiserror::Error;

use crate::config::ServiceConfig;
use crate::health::Probe;
use crate::jobs::WorkerRegistry;

pub use broker::BrokerProbe;
pub use database::DatabaseProbe;
pub use http_api::HttpApiProbe;
pub use workers::WorkersProbe;

/// Primary datastore round trip.
pub const DATABASE_PROBE: &str = "database";
/// Message broker connectivity.
pub const BROKER_PROBE: &str = "broker";
/// Execution pool liveness.
pub const WORKERS_PROBE: &str = "workers";
/// LLM provider reachability.
pub const EXTERNAL_API_A_PROBE: &str = "external_api_a";
/// Web search provider reachability.
pub const EXTERNAL_API_B_PROBE: &str = "external_api_b";

/// A probe name was registered twice.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("probe {0:?} is already registered")]
pub struct DuplicateProbeError(pub String);

struct RegisteredProbe {
    probe: Arc<dyn Probe>,
    timeout: Duration,
}

/// Fixed registry of named probes; the health report always lists exactly these.
pub struct ProbeSet {
    default_timeout: Duration,
    probes: Vec<RegisteredProbe>,
}

impl ProbeSet {
    /// Empty set whose probes default to `default_timeout`.
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            default_timeout,
            probes: Vec::new(),
        }
    }

    /// Register `probe` under its own timeout override or the set default.
    pub fn register(&mut self, probe: Arc<dyn Probe>) -> Result<(), DuplicateProbeError> {
        let timeout = probe.timeout().unwrap_or(self.default_timeout);
        self.register_with_timeout(probe, timeout)
    }

    /// Register `probe` with an explicit timeout.
    pub fn register_with_timeout(
        &mut self,
        probe: Arc<dyn Probe>,
        timeout: Duration,
    ) -> Result<(), DuplicateProbeError> {
        if self.probes.iter().any(|entry| entry.probe.name() == probe.name()) {
            return Err(DuplicateProbeError(probe.name().to_string()));
        }
        self.probes.push(RegisteredProbe { probe, timeout });
        Ok(())
    }

    /// Standard five-probe set built from service configuration.
    pub fn from_config(
        config: &ServiceConfig,
        broker: BrokerProbe,
        registry: Arc<dyn WorkerRegistry>,
    ) -> Result<Self, DuplicateProbeError> {
        let health = &config.health;
        let mut set = Self::new(health.default_timeout());

        set.register_with_timeout(
            Arc::new(DatabaseProbe::new(DATABASE_PROBE, config.database_url.clone())),
            health.timeout_for(DATABASE_PROBE),
        )?;
        set.register_with_timeout(Arc::new(broker), health.timeout_for(BROKER_PROBE))?;
        set.register_with_timeout(
            Arc::new(WorkersProbe::new(WORKERS_PROBE, registry)),
            health.timeout_for(WORKERS_PROBE),
        )?;

        let llm = &config.answer.llm;
        set.register_with_timeout(
            Arc::new(HttpApiProbe::get(
                EXTERNAL_API_A_PROBE,
                llm.models_url(),
                llm.api_key.clone(),
            )),
            health.timeout_for(EXTERNAL_API_A_PROBE),
        )?;

        let search = config.answer.search.clone().unwrap_or_default();
        set.register_with_timeout(
            Arc::new(HttpApiProbe::post_json(
                EXTERNAL_API_B_PROBE,
                search.search_url(),
                json!({"query": "test", "api_key": search.api_key.clone()}),
                search.api_key,
            )),
            health.timeout_for(EXTERNAL_API_B_PROBE),
        )?;
        Ok(set)
    }

    /// Names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.probes.iter().map(|entry| entry.probe.name()).collect()
    }

    /// Number of registered probes.
    pub fn len(&self) -> usize {
        self.probes.len()
    }

    /// Whether no probe is registered.
    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    /// Timeout applied to probe `name`.
    pub fn timeout_of(&self, name: &str) -> Option<Duration> {
        self.probes
            .iter()
            .find(|entry| entry.probe.name() == name)
            .map(|entry| entry.timeout)
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (&Arc<dyn Probe>, Duration)> {
        self.probes.iter().map(|entry| (&entry.probe, entry.timeout))
    }
}
