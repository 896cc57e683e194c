//! omni-query CLI: serve (gateway + workers), gateway, worker, or one-shot health.
//!
//! Settings come from `packages/conf/omni-query.yaml` and the user's
//! `omni-dev-fusion/omni-query.yaml` (override the config home with `--conf`).
//!
//! Logging: set `RUST_LOG=omni_query=info` (or `warn`, `debug`) to see service logs on stderr.

mod cli;
mod nodes;
mod service_builder;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use omni_query::{ConfigOverrides, ServiceConfig, load_runtime_settings, set_config_home_override};

use crate::cli::{Cli, Command};
use crate::nodes::{run_gateway_mode, run_health_mode, run_serve_mode, run_worker_mode};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    if let Some(conf_dir) = cli.conf.clone() {
        set_config_home_override(conf_dir);
    }

    // RUST_LOG overrides; --verbose => debug; else info
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose {
            "omni_query=debug,omni_answer=debug"
        } else {
            "omni_query=info,omni_answer=info"
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let runtime_settings = load_runtime_settings();
    let overrides = match &cli.command {
        Command::Serve {
            bind,
            workers,
            queue_backend,
        } => ConfigOverrides {
            bind: bind.clone(),
            workers: *workers,
            queue_backend: queue_backend.map(Into::into),
        },
        Command::Gateway { bind } => ConfigOverrides {
            bind: bind.clone(),
            ..ConfigOverrides::default()
        },
        Command::Worker { workers } => ConfigOverrides {
            workers: *workers,
            ..ConfigOverrides::default()
        },
        Command::Health => ConfigOverrides::default(),
    };
    let config = ServiceConfig::resolve(&runtime_settings, &overrides)?;

    match cli.command {
        Command::Serve { .. } => run_serve_mode(&config).await?,
        Command::Gateway { .. } => run_gateway_mode(&config).await?,
        Command::Worker { .. } => run_worker_mode(&config).await?,
        Command::Health => {
            if !run_health_mode(&config).await? {
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
