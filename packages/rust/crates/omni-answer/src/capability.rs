//! Answering capability: query (+ optional web context) → summary text.

use async_trait::async_trait;

use crate::config::AnswerConfig;
use crate::error::AnswerError;
use crate::llm::LlmClient;
use crate::prompt::{direct_prompt, join_web_content, web_prompt};
use crate::search::SearchClient;

/// Async answering abstraction so workers can run via [`Summarizer`] or test doubles.
#[async_trait]
pub trait AnsweringCapability: Send + Sync {
    /// Produce summary text for `query`, consulting web search when asked.
    async fn answer(&self, query: &str, use_web_search: bool) -> Result<String, AnswerError>;
}

/// LLM-backed summarizer with optional web search augmentation.
pub struct Summarizer {
    llm: LlmClient,
    search: Option<SearchClient>,
}

impl Summarizer {
    /// Compose from pre-built clients.
    pub fn new(llm: LlmClient, search: Option<SearchClient>) -> Self {
        Self { llm, search }
    }

    /// Build both clients from configuration.
    pub fn from_config(config: &AnswerConfig) -> Self {
        Self {
            llm: LlmClient::new(&config.llm),
            search: config.search.as_ref().map(SearchClient::new),
        }
    }

    /// Whether web search requests can be served.
    pub fn web_search_enabled(&self) -> bool {
        self.search.is_some()
    }
}

#[async_trait]
impl AnsweringCapability for Summarizer {
    async fn answer(&self, query: &str, use_web_search: bool) -> Result<String, AnswerError> {
        if !use_web_search {
            return self.llm.complete(&direct_prompt(query)).await;
        }
        let search = self.search.as_ref().ok_or_else(|| {
            AnswerError::NotConfigured(
                "web search requested but no search provider is configured".to_string(),
            )
        })?;
        let hits = search.search(query).await?;
        tracing::debug!(
            hits = hits.len(),
            model = self.llm.model(),
            "web search context collected"
        );
        let web_content = join_web_content(&hits);
        self.llm.complete(&web_prompt(query, &web_content)).await
    }
}
