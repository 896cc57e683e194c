use async_trait::async_trait;
use sqlx::Connection;
use sqlx::postgres::PgConnection;

use crate::health::{Probe, ProbeError};

/// One-shot `SELECT 1` against the primary PostgreSQL store.
pub struct DatabaseProbe {
    name: String,
    url: Option<String>,
}

impl DatabaseProbe {
    /// Probe the database at `url`; `None` reports the component as unconfigured.
    pub fn new(name: impl Into<String>, url: Option<String>) -> Self {
        Self {
            name: name.into(),
            url,
        }
    }
}

#[async_trait]
impl Probe for DatabaseProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> Result<(), ProbeError> {
        let Some(url) = self.url.as_deref() else {
            return Err(ProbeError::NotConfigured(
                "DATABASE_URL is not configured".to_string(),
            ));
        };
        let mut connection = PgConnection::connect(url)
            .await
            .map_err(|error| ProbeError::Unreachable(error.to_string()))?;
        let value: i32 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&mut connection)
            .await
            .map_err(|error| ProbeError::Unreachable(error.to_string()))?;
        if let Err(error) = connection.close().await {
            tracing::debug!(error = %error, "database probe connection close failed");
        }
        if value == 1 {
            Ok(())
        } else {
            Err(ProbeError::UnexpectedReply(format!("SELECT 1 returned {value}")))
        }
    }
}
