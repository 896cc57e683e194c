//! Shared Valkey/Redis connection handling for the queue, job store and worker registry.

use std::sync::Arc;
use std::time::Duration;

use redis::aio::MultiplexedConnection;
use redis::{FromRedisValue, RedisResult};
use tokio::sync::Mutex;

use crate::observability::ServiceEvent;

/// Extra client-side wait on top of a server-side blocking timeout.
const BLOCKING_RESPONSE_TIMEOUT_GRACE_MS: u64 = 500;

/// Lazily connected client that retries a failed command once after reconnecting.
#[derive(Clone)]
pub(crate) struct ValkeyClient {
    client: redis::Client,
    label: &'static str,
    connection: Arc<Mutex<Option<MultiplexedConnection>>>,
}

impl ValkeyClient {
    /// Parse `url`; no connection is opened until the first command.
    pub(crate) fn open(url: &str, label: &'static str) -> RedisResult<Self> {
        Ok(Self {
            client: redis::Client::open(url)?,
            label,
            connection: Arc::new(Mutex::new(None)),
        })
    }

    async fn connection<'a>(
        &self,
        slot: &'a mut Option<MultiplexedConnection>,
    ) -> RedisResult<&'a mut MultiplexedConnection> {
        let connection = match slot.take() {
            Some(connection) => connection,
            None => {
                let connection = self.client.get_multiplexed_async_connection().await?;
                tracing::debug!(
                    event = ServiceEvent::ValkeyConnected.as_str(),
                    backend = self.label,
                    "valkey backend connected"
                );
                connection
            }
        };
        Ok(slot.insert(connection))
    }

    async fn try_command<T, F>(&self, build: &F) -> RedisResult<T>
    where
        T: FromRedisValue + Send,
        F: Fn() -> redis::Cmd,
    {
        let mut conn_guard = self.connection.lock().await;
        let conn = self.connection(&mut conn_guard).await?;
        let result = build().query_async(conn).await;
        if result.is_err() {
            *conn_guard = None;
        }
        result
    }

    /// Run a command that must not be replayed; a failure only drops the connection.
    ///
    /// The caller cannot tell whether a failed command was applied and has to
    /// re-read the affected state before trying again.
    pub(crate) async fn run_command_once<T, F>(
        &self,
        operation: &'static str,
        build: F,
    ) -> RedisResult<T>
    where
        T: FromRedisValue + Send,
        F: Fn() -> redis::Cmd,
    {
        self.try_command(&build).await.inspect_err(|error| {
            tracing::warn!(
                event = ServiceEvent::ValkeyCommandRetryFailed.as_str(),
                backend = self.label,
                operation,
                attempt = 1,
                error = %error,
                "valkey command failed; outcome unknown"
            );
        })
    }

    /// Run one command, reconnecting and retrying once on failure.
    pub(crate) async fn run_command<T, F>(&self, operation: &'static str, build: F) -> RedisResult<T>
    where
        T: FromRedisValue + Send,
        F: Fn() -> redis::Cmd,
    {
        let first_err = match self.try_command(&build).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        tracing::warn!(
            event = ServiceEvent::ValkeyCommandRetryFailed.as_str(),
            backend = self.label,
            operation,
            attempt = 1,
            error = %first_err,
            "valkey command attempt failed; reconnecting"
        );
        match self.try_command(&build).await {
            Ok(value) => {
                tracing::debug!(
                    event = ServiceEvent::ValkeyCommandRetrySucceeded.as_str(),
                    backend = self.label,
                    operation,
                    attempt = 2,
                    "valkey command succeeded after retry"
                );
                Ok(value)
            }
            Err(err) => {
                tracing::warn!(
                    event = ServiceEvent::ValkeyCommandRetryFailed.as_str(),
                    backend = self.label,
                    operation,
                    attempt = 2,
                    error = %err,
                    "valkey command failed after retry"
                );
                Err(err)
            }
        }
    }

    /// Dedicated connection whose response timeout covers a `block`-long blocking read.
    pub(crate) async fn blocking_connection(
        &self,
        block: Duration,
    ) -> RedisResult<MultiplexedConnection> {
        let config = redis::AsyncConnectionConfig::new()
            .set_response_timeout(Some(blocking_response_timeout(block)));
        self.client
            .get_multiplexed_async_connection_with_config(&config)
            .await
    }
}

pub(crate) fn blocking_response_timeout(block: Duration) -> Duration {
    block.saturating_add(Duration::from_millis(BLOCKING_RESPONSE_TIMEOUT_GRACE_MS))
}
