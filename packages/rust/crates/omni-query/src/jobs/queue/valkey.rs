use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use tokio::sync::Mutex;

use crate::error::QueueError;
use crate::jobs::UnitOfWork;
use crate::valkey::ValkeyClient;

use super::JobQueue;

/// List-backed queue: `LPUSH` to enqueue, `BRPOP` to dequeue.
pub struct ValkeyJobQueue {
    client: ValkeyClient,
    queue_key: String,
    /// Idle blocking-read connections, tagged with the wait they were configured for.
    idle: Mutex<Vec<(Duration, MultiplexedConnection)>>,
}

impl ValkeyJobQueue {
    /// Queue stored at `{key_prefix}:queue`.
    pub fn new(url: &str, key_prefix: &str) -> Result<Self, QueueError> {
        let client = ValkeyClient::open(url, "queue")
            .map_err(|error| QueueError::Backend(error.to_string()))?;
        Ok(Self {
            client,
            queue_key: format!("{key_prefix}:queue"),
            idle: Mutex::new(Vec::new()),
        })
    }

    /// Key holding the pending units.
    pub fn queue_key(&self) -> &str {
        &self.queue_key
    }

    async fn checkout(&self, wait: Duration) -> Result<MultiplexedConnection, QueueError> {
        {
            let mut idle = self.idle.lock().await;
            if let Some(index) = idle.iter().position(|(configured, _)| *configured == wait) {
                let (_, connection) = idle.swap_remove(index);
                return Ok(connection);
            }
        }
        self.client
            .blocking_connection(wait)
            .await
            .map_err(|error| QueueError::Backend(error.to_string()))
    }

    async fn checkin(&self, wait: Duration, connection: MultiplexedConnection) {
        self.idle.lock().await.push((wait, connection));
    }
}

#[async_trait]
impl JobQueue for ValkeyJobQueue {
    async fn enqueue(&self, unit: &UnitOfWork) -> Result<(), QueueError> {
        let payload =
            serde_json::to_string(unit).map_err(|error| QueueError::Malformed(error.to_string()))?;
        let _: i64 = self
            .client
            .run_command("queue_enqueue", || {
                let mut cmd = redis::cmd("LPUSH");
                cmd.arg(&self.queue_key).arg(&payload);
                cmd
            })
            .await
            .map_err(|error| QueueError::Backend(error.to_string()))?;
        Ok(())
    }

    async fn dequeue(&self, wait: Duration) -> Result<Option<UnitOfWork>, QueueError> {
        let wait = wait.max(Duration::from_millis(10));
        let mut connection = self.checkout(wait).await?;
        let popped: redis::RedisResult<Option<(String, String)>> = redis::cmd("BRPOP")
            .arg(&self.queue_key)
            .arg(wait.as_secs_f64())
            .query_async(&mut connection)
            .await;
        let popped = match popped {
            Ok(popped) => {
                self.checkin(wait, connection).await;
                popped
            }
            Err(error) => return Err(QueueError::Backend(error.to_string())),
        };
        let Some((_, payload)) = popped else {
            return Ok(None);
        };
        serde_json::from_str::<UnitOfWork>(&payload)
            .map(Some)
            .map_err(|error| QueueError::Malformed(format!("{error}: {payload}")))
    }
}
