//! Dependency health: probes, the probe registry, the aggregator and the report model.

mod aggregator;
mod probe;
mod probes;
mod report;

pub use aggregator::HealthAggregator;
pub use probe::{Probe, ProbeError, classify_probe_result};
pub use probes::{
    BROKER_PROBE, BrokerProbe, DATABASE_PROBE, DatabaseProbe, DuplicateProbeError,
    EXTERNAL_API_A_PROBE, EXTERNAL_API_B_PROBE, HttpApiProbe, ProbeSet, WORKERS_PROBE,
    WorkersProbe,
};
pub use report::{HealthReport, HealthStatus, ProbeResult};
