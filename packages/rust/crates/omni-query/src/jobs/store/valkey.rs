use async_trait::async_trait;

use crate::error::StoreError;
use crate::jobs::{JobRecord, JobTransition};
use crate::valkey::ValkeyClient;

use super::JobStore;

/// Attempts before a contended compare-and-set is reported as a backend error.
const MAX_TRANSITION_ATTEMPTS: usize = 3;

/// Replace the record only if its stored status still equals ARGV[1].
/// Returns -1 when the key is gone, 0 on a status mismatch, 1 on write.
const COMPARE_AND_SET_SCRIPT: &str = r"
local current = redis.call('GET', KEYS[1])
if not current then
  return -1
end
local decoded = cjson.decode(current)
if decoded['status'] ~= ARGV[1] then
  return 0
end
redis.call('SET', KEYS[1], ARGV[2], 'KEEPTTL')
return 1
";

/// JSON records at `{prefix}:job:{id}` with a retention TTL.
pub struct ValkeyJobStore {
    client: ValkeyClient,
    key_prefix: String,
    ttl_secs: u64,
}

impl ValkeyJobStore {
    /// Store records under `{key_prefix}:job:*`, expiring `ttl_secs` after creation.
    pub fn new(url: &str, key_prefix: &str, ttl_secs: u64) -> Result<Self, StoreError> {
        let client = ValkeyClient::open(url, "job_store")
            .map_err(|error| StoreError::Backend(error.to_string()))?;
        Ok(Self {
            client,
            key_prefix: key_prefix.to_string(),
            ttl_secs: ttl_secs.max(1),
        })
    }

    /// Key holding `job_id`'s record.
    pub fn record_key(&self, job_id: &str) -> String {
        format!("{}:job:{}", self.key_prefix, job_id)
    }

    fn decode(job_id: &str, raw: &str) -> Result<JobRecord, StoreError> {
        serde_json::from_str(raw).map_err(|error| StoreError::Malformed {
            job_id: job_id.to_string(),
            message: error.to_string(),
        })
    }

    fn encode(record: &JobRecord) -> Result<String, StoreError> {
        serde_json::to_string(record).map_err(|error| StoreError::Malformed {
            job_id: record.id.clone(),
            message: error.to_string(),
        })
    }
}

fn backend(error: &redis::RedisError) -> StoreError {
    StoreError::Backend(error.to_string())
}

#[async_trait]
impl JobStore for ValkeyJobStore {
    async fn create(&self, record: &JobRecord) -> Result<(), StoreError> {
        let key = self.record_key(&record.id);
        let payload = Self::encode(record)?;
        let ttl_secs = self.ttl_secs;
        let written: Option<String> = self
            .client
            .run_command("job_create", || {
                let mut cmd = redis::cmd("SET");
                cmd.arg(&key)
                    .arg(&payload)
                    .arg("NX")
                    .arg("EX")
                    .arg(ttl_secs);
                cmd
            })
            .await
            .map_err(|error| backend(&error))?;
        if written.is_none() {
            return Err(StoreError::Duplicate(record.id.clone()));
        }
        Ok(())
    }

    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>, StoreError> {
        let key = self.record_key(job_id);
        let raw: Option<String> = self
            .client
            .run_command("job_get", || {
                let mut cmd = redis::cmd("GET");
                cmd.arg(&key);
                cmd
            })
            .await
            .map_err(|error| backend(&error))?;
        raw.map(|raw| Self::decode(job_id, &raw)).transpose()
    }

    async fn transition(
        &self,
        job_id: &str,
        transition: JobTransition,
    ) -> Result<JobRecord, StoreError> {
        let key = self.record_key(job_id);
        let mut unacknowledged: Option<JobRecord> = None;
        let mut last_error: Option<redis::RedisError> = None;
        for _ in 0..MAX_TRANSITION_ATTEMPTS {
            let current = self
                .get(job_id)
                .await?
                .ok_or_else(|| StoreError::NotFound(job_id.to_string()))?;
            // A write whose reply was lost may already be in place.
            if unacknowledged.as_ref() == Some(&current) {
                return Ok(current);
            }
            let mut record = current;
            let expected = record.status;
            record.apply(transition.clone())?;
            let payload = Self::encode(&record)?;
            let outcome: Result<i64, _> = self
                .client
                .run_command_once("job_transition", || {
                    let mut cmd = redis::cmd("EVAL");
                    cmd.arg(COMPARE_AND_SET_SCRIPT)
                        .arg(1)
                        .arg(&key)
                        .arg(expected.as_str())
                        .arg(&payload);
                    cmd
                })
                .await;
            match outcome {
                Ok(1) => return Ok(record),
                Ok(-1) => return Err(StoreError::NotFound(job_id.to_string())),
                Ok(_) => {}
                Err(error) => {
                    unacknowledged = Some(record);
                    last_error = Some(error);
                }
            }
        }
        match last_error {
            Some(error) => Err(backend(&error)),
            None => Err(StoreError::Backend(format!(
                "job {job_id}: status changed concurrently {MAX_TRANSITION_ATTEMPTS} times"
            ))),
        }
    }

    async fn discard(&self, job_id: &str) -> Result<(), StoreError> {
        let key = self.record_key(job_id);
        let _: i64 = self
            .client
            .run_command("job_discard", || {
                let mut cmd = redis::cmd("DEL");
                cmd.arg(&key);
                cmd
            })
            .await
            .map_err(|error| backend(&error))?;
        Ok(())
    }
}
