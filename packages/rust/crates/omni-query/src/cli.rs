use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use omni_query::QueueBackend;

#[derive(Parser)]
#[command(name = "omni-query")]
#[command(about = "Asynchronous query answering with a worker pool and dependency health checks.")]
pub(crate) struct Cli {
    /// Override config directory (holds `omni-dev-fusion/omni-query.yaml`).
    #[arg(long, global = true)]
    pub(crate) conf: Option<PathBuf>,

    /// Debug logging (RUST_LOG still wins).
    #[arg(long, short, global = true)]
    pub(crate) verbose: bool,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum QueueBackendMode {
    Valkey,
    Memory,
}

impl From<QueueBackendMode> for QueueBackend {
    fn from(mode: QueueBackendMode) -> Self {
        match mode {
            QueueBackendMode::Valkey => Self::Valkey,
            QueueBackendMode::Memory => Self::Memory,
        }
    }
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// HTTP gateway plus an embedded execution pool. Default bind: 0.0.0.0:8000
    Serve {
        /// Listen address (default: settings `gateway.bind`, then 0.0.0.0:8000)
        #[arg(long)]
        bind: Option<String>,

        /// Worker count (default: settings `workers.concurrency`, then 4)
        #[arg(long)]
        workers: Option<usize>,

        /// Queue/store backend (default: valkey when a broker URL is set, else memory)
        #[arg(long, value_enum)]
        queue_backend: Option<QueueBackendMode>,
    },
    /// HTTP gateway only; workers run elsewhere against the shared Valkey queue.
    Gateway {
        /// Listen address (default: settings `gateway.bind`, then 0.0.0.0:8000)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Execution pool only.
    Worker {
        /// Worker count (default: settings `workers.concurrency`, then 4)
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Run one health aggregation, print the JSON report, exit 1 when unhealthy.
    Health,
}
