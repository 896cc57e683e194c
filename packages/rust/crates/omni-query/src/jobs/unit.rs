use serde::{Deserialize, Serialize};

use super::record::JobRecord;

/// Explicitly serialized payload carried by the durable queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOfWork {
    /// Id of the PENDING record this unit executes.
    pub job_id: String,
    /// Input text.
    pub query: String,
    /// Whether the answer should be augmented with web search.
    pub use_web_search: bool,
}

impl UnitOfWork {
    /// Unit that executes `record`.
    pub fn for_record(record: &JobRecord) -> Self {
        Self {
            job_id: record.id.clone(),
            query: record.query.clone(),
            use_web_search: record.use_web_search,
        }
    }
}
