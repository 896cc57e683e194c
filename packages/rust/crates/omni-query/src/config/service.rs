//! Resolved service configuration, built once at startup and passed by reference.
//!
//! Every value resolves in the order CLI override, environment, settings
//! file, built-in default. Invalid environment or settings values are logged
//! and skipped rather than aborting startup.

use std::collections::BTreeMap;
use std::time::Duration;

use omni_answer::{
    AnswerConfig, DEFAULT_MODEL, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SEARCH_MAX_RESULTS,
    LlmClientConfig, OPENAI_DEFAULT_BASE_URL, SEARCH_DEFAULT_BASE_URL, SearchClientConfig,
};
use thiserror::Error;

use crate::jobs::PoolConfig;

use super::settings::RuntimeSettings;

/// Default HTTP listen address.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
/// Default namespace for Valkey keys.
pub const DEFAULT_KEY_PREFIX: &str = "omni-query";
/// Default job record retention.
pub const DEFAULT_RESULT_TTL_SECS: u64 = 86_400;
/// Default in-process queue capacity.
pub const DEFAULT_MEMORY_QUEUE_CAPACITY: usize = 1_024;
/// Default per-probe timeout.
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;

/// Environment lookup used during resolution.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Configuration errors that prevent startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The Valkey backend was selected without a broker URL.
    #[error("queue backend `valkey` requires VALKEY_URL, CELERY_BROKER_URL or queue.url")]
    MissingQueueUrl,
}

/// Queue, job store and worker registry backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueBackend {
    /// Shared Valkey/Redis broker; gateway and workers may run as separate processes.
    Valkey,
    /// In-process structures; gateway and workers must share one process.
    Memory,
}

impl QueueBackend {
    /// Parse `valkey`/`redis`/`memory` (case-insensitive).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "valkey" | "redis" => Some(Self::Valkey),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }

    /// Canonical name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Valkey => "valkey",
            Self::Memory => "memory",
        }
    }
}

/// Values supplied on the command line; `None` defers to env/settings/defaults.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// `--bind`.
    pub bind: Option<String>,
    /// `--workers`.
    pub workers: Option<usize>,
    /// `--queue-backend`.
    pub queue_backend: Option<QueueBackend>,
}

/// HTTP gateway settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Listen address.
    pub bind: String,
}

/// Queue/store/registry backend settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Selected backend.
    pub backend: QueueBackend,
    /// Broker URL (required for Valkey).
    pub url: Option<String>,
    /// Key namespace.
    pub key_prefix: String,
    /// Record retention in seconds.
    pub result_ttl_secs: u64,
    /// Capacity of the in-process queue.
    pub memory_capacity: usize,
}

/// Probe timeouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthConfig {
    /// Default per-probe timeout in seconds.
    pub timeout_secs: u64,
    /// Per-probe overrides in seconds, keyed by probe name.
    pub probe_timeouts: BTreeMap<String, u64>,
}

impl HealthConfig {
    /// Default per-probe timeout.
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Timeout for probe `name` (override or default).
    pub fn timeout_for(&self, name: &str) -> Duration {
        self.probe_timeouts
            .get(name)
            .copied()
            .filter(|secs| *secs > 0)
            .map_or_else(|| self.default_timeout(), Duration::from_secs)
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            probe_timeouts: BTreeMap::new(),
        }
    }
}

/// Fully resolved configuration shared by every component.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// HTTP gateway.
    pub gateway: GatewayConfig,
    /// Queue and storage backend.
    pub queue: QueueConfig,
    /// Execution pool.
    pub pool: PoolConfig,
    /// Dependency probes.
    pub health: HealthConfig,
    /// Answering capability providers.
    pub answer: AnswerConfig,
    /// Primary datastore URL for the database probe.
    pub database_url: Option<String>,
}

impl ServiceConfig {
    /// Resolve from CLI overrides, the process environment and `settings`.
    pub fn resolve(
        settings: &RuntimeSettings,
        overrides: &ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        Self::resolve_with_env(settings, overrides, &|name| std::env::var(name).ok())
    }

    /// Resolve with an explicit environment lookup.
    pub fn resolve_with_env(
        settings: &RuntimeSettings,
        overrides: &ConfigOverrides,
        env: EnvLookup<'_>,
    ) -> Result<Self, ConfigError> {
        let resolver = Resolver { env };

        let gateway = GatewayConfig {
            bind: resolver.string(
                overrides.bind.clone(),
                "OMNI_QUERY_BIND",
                settings.gateway.bind.as_deref(),
                DEFAULT_BIND_ADDR,
            ),
        };

        let queue_url = resolver
            .optional_string("VALKEY_URL", settings.queue.url.as_deref())
            .or_else(|| resolver.env_string("CELERY_BROKER_URL"));
        let backend = resolver.queue_backend(
            overrides.queue_backend,
            settings.queue.backend.as_deref(),
            queue_url.is_some(),
        );
        if backend == QueueBackend::Valkey && queue_url.is_none() {
            return Err(ConfigError::MissingQueueUrl);
        }
        let queue = QueueConfig {
            backend,
            url: queue_url,
            key_prefix: resolver.string(
                None,
                "OMNI_QUERY_KEY_PREFIX",
                settings.queue.key_prefix.as_deref(),
                DEFAULT_KEY_PREFIX,
            ),
            result_ttl_secs: resolver.positive_u64(
                "OMNI_QUERY_RESULT_TTL_SECS",
                settings.queue.result_ttl_secs,
                DEFAULT_RESULT_TTL_SECS,
            ),
            memory_capacity: resolver.positive_usize(
                None,
                "OMNI_QUERY_MEMORY_QUEUE_CAPACITY",
                settings.queue.memory_capacity,
                DEFAULT_MEMORY_QUEUE_CAPACITY,
            ),
        };

        let pool_defaults = PoolConfig::default();
        let workers = &settings.workers;
        let pool = PoolConfig {
            concurrency: resolver.positive_usize(
                overrides.workers,
                "OMNI_QUERY_WORKERS",
                workers.concurrency,
                pool_defaults.concurrency,
            ),
            job_timeout_secs: resolver.positive_u64(
                "OMNI_QUERY_JOB_TIMEOUT_SECS",
                workers.job_timeout_secs,
                pool_defaults.job_timeout_secs,
            ),
            dequeue_wait_ms: resolver.positive_u64(
                "OMNI_QUERY_DEQUEUE_WAIT_MS",
                workers.dequeue_wait_ms,
                pool_defaults.dequeue_wait_ms,
            ),
            heartbeat_interval_secs: resolver.positive_u64(
                "OMNI_QUERY_HEARTBEAT_INTERVAL_SECS",
                workers.heartbeat_interval_secs,
                pool_defaults.heartbeat_interval_secs,
            ),
            heartbeat_ttl_secs: resolver.positive_u64(
                "OMNI_QUERY_HEARTBEAT_TTL_SECS",
                workers.heartbeat_ttl_secs,
                pool_defaults.heartbeat_ttl_secs,
            ),
            worker_label: resolver.string(
                None,
                "OMNI_QUERY_WORKER_LABEL",
                workers.label.as_deref(),
                &pool_defaults.worker_label,
            ),
        };

        let health = HealthConfig {
            timeout_secs: resolver.positive_u64(
                "OMNI_QUERY_HEALTH_TIMEOUT_SECS",
                settings.health.timeout_secs,
                DEFAULT_PROBE_TIMEOUT_SECS,
            ),
            probe_timeouts: settings.health.probe_timeouts.clone().unwrap_or_default(),
        };

        let llm = &settings.llm;
        let llm = LlmClientConfig {
            base_url: resolver.string(
                None,
                "OMNI_QUERY_LLM_BASE_URL",
                llm.base_url.as_deref(),
                OPENAI_DEFAULT_BASE_URL,
            ),
            model: resolver.string(
                None,
                "OMNI_QUERY_LLM_MODEL",
                llm.model.as_deref(),
                DEFAULT_MODEL,
            ),
            api_key: resolver.optional_string("OPENAI_API_KEY", llm.api_key.as_deref()),
            request_timeout_secs: resolver.positive_u64(
                "OMNI_QUERY_LLM_TIMEOUT_SECS",
                llm.request_timeout_secs,
                DEFAULT_REQUEST_TIMEOUT_SECS,
            ),
        };

        let search = &settings.search;
        let search = search.enabled.unwrap_or(true).then(|| SearchClientConfig {
            base_url: resolver.string(
                None,
                "OMNI_QUERY_SEARCH_BASE_URL",
                search.base_url.as_deref(),
                SEARCH_DEFAULT_BASE_URL,
            ),
            api_key: resolver.optional_string("TAVILY_API_KEY", search.api_key.as_deref()),
            max_results: resolver.positive_usize(
                None,
                "OMNI_QUERY_SEARCH_MAX_RESULTS",
                search.max_results,
                DEFAULT_SEARCH_MAX_RESULTS,
            ),
            request_timeout_secs: resolver.positive_u64(
                "OMNI_QUERY_SEARCH_TIMEOUT_SECS",
                search.request_timeout_secs,
                DEFAULT_REQUEST_TIMEOUT_SECS,
            ),
        });

        Ok(Self {
            gateway,
            queue,
            pool,
            health,
            answer: AnswerConfig { llm, search },
            database_url: resolver
                .optional_string("DATABASE_URL", settings.database.url.as_deref()),
        })
    }
}

struct Resolver<'a> {
    env: EnvLookup<'a>,
}

impl Resolver<'_> {
    fn env_string(&self, name: &str) -> Option<String> {
        (self.env)(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn string(
        &self,
        cli_value: Option<String>,
        env_name: &str,
        settings_value: Option<&str>,
        default: &str,
    ) -> String {
        if let Some(value) = cli_value {
            return value;
        }
        if let Some(value) = self.env_string(env_name) {
            return value;
        }
        if let Some(value) = settings_value
            && !value.trim().is_empty()
        {
            return value.trim().to_string();
        }
        default.to_string()
    }

    fn optional_string(&self, env_name: &str, settings_value: Option<&str>) -> Option<String> {
        self.env_string(env_name).or_else(|| {
            settings_value
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(ToString::to_string)
        })
    }

    fn parse_positive<T>(&self, env_name: &str) -> Option<T>
    where
        T: std::str::FromStr + PartialOrd + Default,
    {
        let raw = self.env_string(env_name)?;
        match raw.parse::<T>() {
            Ok(value) if value > T::default() => Some(value),
            _ => {
                tracing::warn!(env_var = %env_name, value = %raw, "invalid positive integer env value");
                None
            }
        }
    }

    fn positive_u64(&self, env_name: &str, settings_value: Option<u64>, default: u64) -> u64 {
        if let Some(value) = self.parse_positive::<u64>(env_name) {
            return value;
        }
        settings_value.filter(|value| *value > 0).unwrap_or(default)
    }

    fn positive_usize(
        &self,
        cli_value: Option<usize>,
        env_name: &str,
        settings_value: Option<usize>,
        default: usize,
    ) -> usize {
        if let Some(value) = cli_value
            && value > 0
        {
            return value;
        }
        if let Some(value) = self.parse_positive::<usize>(env_name) {
            return value;
        }
        settings_value.filter(|value| *value > 0).unwrap_or(default)
    }

    fn queue_backend(
        &self,
        cli_backend: Option<QueueBackend>,
        settings_backend: Option<&str>,
        has_url: bool,
    ) -> QueueBackend {
        if let Some(backend) = cli_backend {
            return backend;
        }
        if let Some(raw) = self.env_string("OMNI_QUERY_QUEUE_BACKEND") {
            if let Some(backend) = QueueBackend::parse(&raw) {
                return backend;
            }
            tracing::warn!(
                value = %raw,
                "invalid OMNI_QUERY_QUEUE_BACKEND; using settings/default"
            );
        }
        if let Some(raw) = settings_backend {
            if let Some(backend) = QueueBackend::parse(raw) {
                return backend;
            }
            tracing::warn!(value = %raw, "invalid queue.backend in settings; using default");
        }
        if has_url {
            QueueBackend::Valkey
        } else {
            QueueBackend::Memory
        }
    }
}
