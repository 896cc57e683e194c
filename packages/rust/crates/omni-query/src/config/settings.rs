//! Runtime settings loader for omni-query.
//!
//! Loads and merges:
//! - System defaults: `<PRJ_ROOT>/packages/conf/omni-query.yaml`
//! - User overrides:  `<PRJ_CONFIG_HOME>/omni-dev-fusion/omni-query.yaml`
//!
//! Merge precedence is user over system.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::Deserialize;

const DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH: &str = "packages/conf/omni-query.yaml";
const DEFAULT_USER_SETTINGS_RELATIVE_PATH: &str = "omni-dev-fusion/omni-query.yaml";
const DEFAULT_CONFIG_HOME_RELATIVE_PATH: &str = ".config";
static CONFIG_HOME_OVERRIDE: OnceLock<PathBuf> = OnceLock::new();

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuntimeSettings {
    #[serde(default)]
    pub gateway: GatewaySettings,
    #[serde(default)]
    pub queue: QueueSettings,
    #[serde(default)]
    pub workers: WorkerSettings,
    #[serde(default)]
    pub health: HealthSettings,
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewaySettings {
    pub bind: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueueSettings {
    pub backend: Option<String>,
    pub url: Option<String>,
    pub key_prefix: Option<String>,
    pub result_ttl_secs: Option<u64>,
    pub memory_capacity: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkerSettings {
    pub concurrency: Option<usize>,
    pub job_timeout_secs: Option<u64>,
    pub dequeue_wait_ms: Option<u64>,
    pub heartbeat_interval_secs: Option<u64>,
    pub heartbeat_ttl_secs: Option<u64>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HealthSettings {
    pub timeout_secs: Option<u64>,
    pub probe_timeouts: Option<BTreeMap<String, u64>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LlmSettings {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchSettings {
    pub enabled: Option<bool>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub max_results: Option<usize>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseSettings {
    pub url: Option<String>,
}

impl RuntimeSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            gateway: GatewaySettings {
                bind: overlay.gateway.bind.or(self.gateway.bind),
            },
            queue: self.queue.merge(overlay.queue),
            workers: self.workers.merge(overlay.workers),
            health: self.health.merge(overlay.health),
            llm: self.llm.merge(overlay.llm),
            search: self.search.merge(overlay.search),
            database: DatabaseSettings {
                url: overlay.database.url.or(self.database.url),
            },
        }
    }
}

impl QueueSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            backend: overlay.backend.or(self.backend),
            url: overlay.url.or(self.url),
            key_prefix: overlay.key_prefix.or(self.key_prefix),
            result_ttl_secs: overlay.result_ttl_secs.or(self.result_ttl_secs),
            memory_capacity: overlay.memory_capacity.or(self.memory_capacity),
        }
    }
}

impl WorkerSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            concurrency: overlay.concurrency.or(self.concurrency),
            job_timeout_secs: overlay.job_timeout_secs.or(self.job_timeout_secs),
            dequeue_wait_ms: overlay.dequeue_wait_ms.or(self.dequeue_wait_ms),
            heartbeat_interval_secs: overlay
                .heartbeat_interval_secs
                .or(self.heartbeat_interval_secs),
            heartbeat_ttl_secs: overlay.heartbeat_ttl_secs.or(self.heartbeat_ttl_secs),
            label: overlay.label.or(self.label),
        }
    }
}

impl HealthSettings {
    fn merge(self, overlay: Self) -> Self {
        let probe_timeouts = match (self.probe_timeouts, overlay.probe_timeouts) {
            (Some(mut base), Some(overlay)) => {
                base.extend(overlay);
                Some(base)
            }
            (base, overlay) => overlay.or(base),
        };
        Self {
            timeout_secs: overlay.timeout_secs.or(self.timeout_secs),
            probe_timeouts,
        }
    }
}

impl LlmSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            base_url: overlay.base_url.or(self.base_url),
            model: overlay.model.or(self.model),
            api_key: overlay.api_key.or(self.api_key),
            request_timeout_secs: overlay.request_timeout_secs.or(self.request_timeout_secs),
        }
    }
}

impl SearchSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            enabled: overlay.enabled.or(self.enabled),
            base_url: overlay.base_url.or(self.base_url),
            api_key: overlay.api_key.or(self.api_key),
            max_results: overlay.max_results.or(self.max_results),
            request_timeout_secs: overlay.request_timeout_secs.or(self.request_timeout_secs),
        }
    }
}

/// Load merged runtime settings (user overrides system).
pub fn load_runtime_settings() -> RuntimeSettings {
    let (system_path, user_path) = runtime_settings_paths();
    load_runtime_settings_from_paths(&system_path, &user_path)
}

#[doc(hidden)]
pub fn runtime_settings_paths() -> (PathBuf, PathBuf) {
    let root = project_root();
    let system_path = root.join(DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH);
    let user_path = resolve_config_home(&root).join(DEFAULT_USER_SETTINGS_RELATIVE_PATH);
    (system_path, user_path)
}

#[doc(hidden)]
pub fn load_runtime_settings_from_paths(system: &Path, user: &Path) -> RuntimeSettings {
    load_one(system).merge(load_one(user))
}

fn load_one(path: &Path) -> RuntimeSettings {
    if !path.exists() {
        return RuntimeSettings::default();
    }
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "failed to read settings file; ignoring"
            );
            return RuntimeSettings::default();
        }
    };
    match serde_yaml::from_str::<RuntimeSettings>(&raw) {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "failed to parse settings yaml; ignoring file"
            );
            RuntimeSettings::default()
        }
    }
}

fn project_root() -> PathBuf {
    std::env::var("PRJ_ROOT")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map_or_else(
            || std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            PathBuf::from,
        )
}

/// Set config-home override (used by CLI `--conf`).
///
/// The path can be absolute, or relative to `PRJ_ROOT`/cwd.
pub fn set_config_home_override(path: impl Into<PathBuf>) {
    let path = path.into();
    if path.as_os_str().is_empty() {
        return;
    }
    if CONFIG_HOME_OVERRIDE.set(path.clone()).is_err()
        && let Some(current) = CONFIG_HOME_OVERRIDE.get()
        && current != &path
    {
        tracing::warn!(
            current = %current.display(),
            ignored = %path.display(),
            "config home override already set; ignoring subsequent value"
        );
    }
}

fn resolve_config_home(project_root: &Path) -> PathBuf {
    if let Some(path) = CONFIG_HOME_OVERRIDE.get() {
        return absolutize(project_root, path.clone());
    }

    let configured = std::env::var("PRJ_CONFIG_HOME")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_CONFIG_HOME_RELATIVE_PATH.to_string());
    absolutize(project_root, PathBuf::from(configured))
}

fn absolutize(project_root: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        project_root.join(path)
    }
}
