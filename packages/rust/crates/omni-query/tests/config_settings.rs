#![allow(missing_docs)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use omni_query::{
    ConfigError, ConfigOverrides, QueueBackend, RuntimeSettings, ServiceConfig,
    load_runtime_settings_from_paths,
};
use tempfile::TempDir;

fn write_file(path: PathBuf, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dir");
    }
    std::fs::write(path, content).expect("write yaml");
}

fn resolve(
    settings: &RuntimeSettings,
    overrides: &ConfigOverrides,
    env: &[(&str, &str)],
) -> Result<ServiceConfig, ConfigError> {
    let env: HashMap<String, String> = env
        .iter()
        .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
        .collect();
    ServiceConfig::resolve_with_env(settings, overrides, &|name: &str| env.get(name).cloned())
}

#[test]
fn merge_user_overrides_system() {
    let tmp = TempDir::new().expect("tempdir");
    let system = tmp.path().join("packages/conf/omni-query.yaml");
    let user = tmp.path().join(".config/omni-dev-fusion/omni-query.yaml");

    write_file(
        system.clone(),
        r#"
gateway:
  bind: "0.0.0.0:8000"
queue:
  backend: "valkey"
  url: "redis://system:6379/0"
  key_prefix: "system-prefix"
  result_ttl_secs: 3600
workers:
  concurrency: 4
  job_timeout_secs: 900
  label: "system-pool"
health:
  timeout_secs: 5
  probe_timeouts:
    database: 3
    broker: 2
llm:
  model: "gpt-4o-mini"
  api_key: "sk-system"
search:
  max_results: 5
database:
  url: "postgres://system/db"
"#,
    );
    write_file(
        user.clone(),
        r#"
gateway:
  bind: "127.0.0.1:9000"
queue:
  key_prefix: "user-prefix"
workers:
  concurrency: 8
health:
  probe_timeouts:
    broker: 7
llm:
  model: "gpt-4.1-mini"
search:
  enabled: false
"#,
    );

    let settings = load_runtime_settings_from_paths(&system, &user);

    assert_eq!(settings.gateway.bind.as_deref(), Some("127.0.0.1:9000"));
    assert_eq!(settings.queue.backend.as_deref(), Some("valkey"));
    assert_eq!(settings.queue.url.as_deref(), Some("redis://system:6379/0"));
    assert_eq!(settings.queue.key_prefix.as_deref(), Some("user-prefix"));
    assert_eq!(settings.queue.result_ttl_secs, Some(3600));
    assert_eq!(settings.workers.concurrency, Some(8));
    assert_eq!(settings.workers.job_timeout_secs, Some(900));
    assert_eq!(settings.workers.label.as_deref(), Some("system-pool"));
    assert_eq!(settings.health.timeout_secs, Some(5));
    let probe_timeouts = settings.health.probe_timeouts.clone().expect("probe timeouts");
    assert_eq!(probe_timeouts.get("database"), Some(&3));
    assert_eq!(probe_timeouts.get("broker"), Some(&7));
    assert_eq!(settings.llm.model.as_deref(), Some("gpt-4.1-mini"));
    assert_eq!(settings.llm.api_key.as_deref(), Some("sk-system"));
    assert_eq!(settings.search.enabled, Some(false));
    assert_eq!(settings.search.max_results, Some(5));
    assert_eq!(settings.database.url.as_deref(), Some("postgres://system/db"));
}

#[test]
fn missing_and_invalid_files_fall_back_to_defaults() {
    let tmp = TempDir::new().expect("tempdir");
    let system = tmp.path().join("packages/conf/omni-query.yaml");
    let user = tmp.path().join(".config/omni-dev-fusion/omni-query.yaml");
    write_file(user.clone(), "workers: [this is: not a mapping");

    let settings = load_runtime_settings_from_paths(&system, &user);

    assert!(settings.gateway.bind.is_none());
    assert!(settings.workers.concurrency.is_none());
    assert!(settings.queue.url.is_none());
}

#[test]
fn defaults_without_settings_or_env_use_memory_backend() {
    let config = resolve(&RuntimeSettings::default(), &ConfigOverrides::default(), &[])
        .expect("config");

    assert_eq!(config.gateway.bind, "0.0.0.0:8000");
    assert_eq!(config.queue.backend, QueueBackend::Memory);
    assert!(config.queue.url.is_none());
    assert_eq!(config.queue.key_prefix, "omni-query");
    assert_eq!(config.queue.result_ttl_secs, 86_400);
    assert_eq!(config.pool.concurrency, 4);
    assert_eq!(config.pool.job_timeout_secs, 900);
    assert_eq!(config.health.default_timeout(), Duration::from_secs(5));
    assert_eq!(config.answer.llm.model, "gpt-4o-mini");
    assert_eq!(config.answer.llm.base_url, "https://api.openai.com/v1");
    assert!(config.answer.llm.api_key.is_none());
    let search = config.answer.search.expect("search enabled by default");
    assert_eq!(search.max_results, 5);
    assert_eq!(search.base_url, "https://api.tavily.com");
    assert!(config.database_url.is_none());
}

#[test]
fn broker_url_selects_valkey_backend() {
    let config = resolve(
        &RuntimeSettings::default(),
        &ConfigOverrides::default(),
        &[("CELERY_BROKER_URL", "redis://broker:6379/0")],
    )
    .expect("config");

    assert_eq!(config.queue.backend, QueueBackend::Valkey);
    assert_eq!(config.queue.url.as_deref(), Some("redis://broker:6379/0"));
}

#[test]
fn valkey_url_wins_over_celery_broker_url() {
    let config = resolve(
        &RuntimeSettings::default(),
        &ConfigOverrides::default(),
        &[
            ("VALKEY_URL", "redis://valkey:6379/0"),
            ("CELERY_BROKER_URL", "redis://celery:6379/0"),
        ],
    )
    .expect("config");

    assert_eq!(config.queue.url.as_deref(), Some("redis://valkey:6379/0"));
}

#[test]
fn valkey_backend_without_url_is_a_config_error() {
    let overrides = ConfigOverrides {
        queue_backend: Some(QueueBackend::Valkey),
        ..ConfigOverrides::default()
    };
    let error = resolve(&RuntimeSettings::default(), &overrides, &[]).expect_err("no url");
    assert_eq!(error, ConfigError::MissingQueueUrl);
}

#[test]
fn cli_overrides_env_which_overrides_settings() {
    let mut settings = RuntimeSettings::default();
    settings.gateway.bind = Some("0.0.0.0:7000".to_string());
    settings.workers.concurrency = Some(2);
    settings.workers.job_timeout_secs = Some(60);
    settings.llm.api_key = Some("sk-settings".to_string());
    settings.queue.url = Some("redis://settings:6379/0".to_string());

    let env = [
        ("OMNI_QUERY_BIND", "0.0.0.0:7100"),
        ("OMNI_QUERY_WORKERS", "6"),
        ("OMNI_QUERY_JOB_TIMEOUT_SECS", "120"),
        ("OPENAI_API_KEY", "sk-env"),
        ("DATABASE_URL", "postgres://env/db"),
    ];

    let from_env = resolve(&settings, &ConfigOverrides::default(), &env).expect("config");
    assert_eq!(from_env.gateway.bind, "0.0.0.0:7100");
    assert_eq!(from_env.pool.concurrency, 6);
    assert_eq!(from_env.pool.job_timeout_secs, 120);
    assert_eq!(from_env.answer.llm.api_key.as_deref(), Some("sk-env"));
    assert_eq!(from_env.database_url.as_deref(), Some("postgres://env/db"));
    assert_eq!(from_env.queue.backend, QueueBackend::Valkey);

    let overrides = ConfigOverrides {
        bind: Some("127.0.0.1:9999".to_string()),
        workers: Some(12),
        queue_backend: Some(QueueBackend::Memory),
    };
    let from_cli = resolve(&settings, &overrides, &env).expect("config");
    assert_eq!(from_cli.gateway.bind, "127.0.0.1:9999");
    assert_eq!(from_cli.pool.concurrency, 12);
    assert_eq!(from_cli.queue.backend, QueueBackend::Memory);
}

#[test]
fn invalid_env_values_fall_back_to_settings() {
    let mut settings = RuntimeSettings::default();
    settings.workers.concurrency = Some(3);
    settings.queue.backend = Some("memory".to_string());

    let config = resolve(
        &settings,
        &ConfigOverrides::default(),
        &[
            ("OMNI_QUERY_WORKERS", "zero"),
            ("OMNI_QUERY_HEALTH_TIMEOUT_SECS", "0"),
            ("OMNI_QUERY_QUEUE_BACKEND", "kafka"),
        ],
    )
    .expect("config");

    assert_eq!(config.pool.concurrency, 3);
    assert_eq!(config.health.timeout_secs, 5);
    assert_eq!(config.queue.backend, QueueBackend::Memory);
}

#[test]
fn per_probe_timeouts_override_default() {
    let mut settings = RuntimeSettings::default();
    settings.health.timeout_secs = Some(4);
    settings.health.probe_timeouts = Some(
        [("database".to_string(), 9_u64), ("broker".to_string(), 0)]
            .into_iter()
            .collect(),
    );

    let config = resolve(&settings, &ConfigOverrides::default(), &[]).expect("config");

    assert_eq!(config.health.timeout_for("database"), Duration::from_secs(9));
    assert_eq!(config.health.timeout_for("broker"), Duration::from_secs(4));
    assert_eq!(config.health.timeout_for("workers"), Duration::from_secs(4));
}

#[test]
fn disabled_search_has_no_provider() {
    let mut settings = RuntimeSettings::default();
    settings.search.enabled = Some(false);
    settings.search.api_key = Some("tvly-unused".to_string());

    let config = resolve(&settings, &ConfigOverrides::default(), &[]).expect("config");

    assert!(config.answer.search.is_none());
}
