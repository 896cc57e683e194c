use std::sync::Arc;

use async_trait::async_trait;

use crate::health::{Probe, ProbeError};
use crate::jobs::MemoryJobQueue;

/// Message broker check matching the configured queue backend.
#[derive(Clone)]
pub enum BrokerProbe {
    /// Open a fresh connection to the Valkey/Redis broker and `PING`.
    Valkey {
        /// Component name.
        name: String,
        /// Broker URL.
        url: String,
    },
    /// In-process queue: healthy while it accepts work.
    InProcess {
        /// Component name.
        name: String,
        /// The queue the dispatcher writes to.
        queue: Arc<MemoryJobQueue>,
    },
    /// No broker endpoint configured.
    Unconfigured {
        /// Component name.
        name: String,
    },
}

impl BrokerProbe {
    /// Probe a Valkey/Redis broker at `url`.
    pub fn valkey(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Valkey {
            name: name.into(),
            url: url.into(),
        }
    }

    /// Probe the in-process queue.
    pub fn in_process(name: impl Into<String>, queue: Arc<MemoryJobQueue>) -> Self {
        Self::InProcess {
            name: name.into(),
            queue,
        }
    }

    /// Always-unhealthy placeholder.
    pub fn unconfigured(name: impl Into<String>) -> Self {
        Self::Unconfigured { name: name.into() }
    }
}

async fn ping(url: &str) -> Result<(), ProbeError> {
    let client =
        redis::Client::open(url).map_err(|error| ProbeError::Unreachable(error.to_string()))?;
    let mut connection = client
        .get_multiplexed_async_connection()
        .await
        .map_err(|error| ProbeError::Unreachable(error.to_string()))?;
    let reply: String = redis::cmd("PING")
        .query_async(&mut connection)
        .await
        .map_err(|error| ProbeError::Unreachable(error.to_string()))?;
    if reply.eq_ignore_ascii_case("PONG") {
        Ok(())
    } else {
        Err(ProbeError::UnexpectedReply(reply))
    }
}

#[async_trait]
impl Probe for BrokerProbe {
    fn name(&self) -> &str {
        match self {
            Self::Valkey { name, .. }
            | Self::InProcess { name, .. }
            | Self::Unconfigured { name } => name,
        }
    }

    async fn check(&self) -> Result<(), ProbeError> {
        match self {
            Self::Valkey { url, .. } => ping(url).await,
            Self::InProcess { queue, .. } => {
                if queue.is_closed() {
                    Err(ProbeError::Unreachable(
                        "in-process queue is closed".to_string(),
                    ))
                } else {
                    Ok(())
                }
            }
            Self::Unconfigured { .. } => Err(ProbeError::NotConfigured(
                "broker URL is not configured".to_string(),
            )),
        }
    }
}
