//! Configuration: layered YAML settings plus the resolved [`ServiceConfig`].

mod service;
mod settings;

pub use service::{
    ConfigError, ConfigOverrides, DEFAULT_BIND_ADDR, DEFAULT_KEY_PREFIX,
    DEFAULT_MEMORY_QUEUE_CAPACITY, DEFAULT_PROBE_TIMEOUT_SECS, DEFAULT_RESULT_TTL_SECS,
    EnvLookup, GatewayConfig, HealthConfig, QueueBackend, QueueConfig, ServiceConfig,
};
pub use settings::{
    DatabaseSettings, GatewaySettings, HealthSettings, LlmSettings, QueueSettings,
    RuntimeSettings, SearchSettings, WorkerSettings, load_runtime_settings,
    load_runtime_settings_from_paths, runtime_settings_paths, set_config_home_override,
};
