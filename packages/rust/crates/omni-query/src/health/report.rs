use std::collections::BTreeMap;

use serde::Serialize;

use super::probe::ProbeError;

/// Outcome of one probe in one aggregation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    /// Component key.
    pub name: String,
    /// Whether the dependency is usable.
    pub healthy: bool,
    /// Failure detail; present iff not healthy.
    pub error: Option<String>,
}

impl ProbeResult {
    /// Healthy component.
    pub fn healthy(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            healthy: true,
            error: None,
        }
    }

    /// Unhealthy component with `error` as detail.
    pub fn unhealthy(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            healthy: false,
            error: Some(error.into()),
        }
    }

    /// Result for a finished probe run.
    pub fn from_outcome(name: impl Into<String>, outcome: Result<(), ProbeError>) -> Self {
        match outcome {
            Ok(()) => Self::healthy(name),
            Err(error) => Self::unhealthy(name, error.to_string()),
        }
    }
}

/// Composite verdict over every registered probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "HealthReportBody")]
pub struct HealthReport {
    components: BTreeMap<String, ProbeResult>,
}

impl HealthReport {
    /// Build from one result per probe.
    pub fn from_results(results: impl IntoIterator<Item = ProbeResult>) -> Self {
        Self {
            components: results
                .into_iter()
                .map(|result| (result.name.clone(), result))
                .collect(),
        }
    }

    /// AND over every component (vacuously true for an empty set).
    pub fn is_healthy(&self) -> bool {
        self.components.values().all(|component| component.healthy)
    }

    /// Result for component `name`.
    pub fn component(&self, name: &str) -> Option<&ProbeResult> {
        self.components.get(name)
    }

    /// Components sorted by name.
    pub fn components(&self) -> impl Iterator<Item = &ProbeResult> {
        self.components.values()
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether the report has no components.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

/// `"healthy"` / `"unhealthy"` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Usable.
    Healthy,
    /// Not usable.
    Unhealthy,
}

impl From<bool> for HealthStatus {
    fn from(healthy: bool) -> Self {
        if healthy {
            Self::Healthy
        } else {
            Self::Unhealthy
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthReportBody {
    status: HealthStatus,
    components: BTreeMap<String, ComponentBody>,
}

#[derive(Debug, Serialize)]
struct ComponentBody {
    status: HealthStatus,
    error: Option<String>,
}

impl From<HealthReport> for HealthReportBody {
    fn from(report: HealthReport) -> Self {
        let status = HealthStatus::from(report.is_healthy());
        let components = report
            .components
            .into_iter()
            .map(|(name, result)| {
                (
                    name,
                    ComponentBody {
                        status: HealthStatus::from(result.healthy),
                        error: result.error,
                    },
                )
            })
            .collect();
        Self { status, components }
    }
}
