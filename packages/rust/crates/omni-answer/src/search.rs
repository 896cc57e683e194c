//! Web search client (Tavily-compatible `POST /search`).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::SearchClientConfig;
use crate::error::AnswerError;

const UPSTREAM: &str = "web_search";

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

/// One search result.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchHit {
    /// Page title.
    #[serde(default)]
    pub title: Option<String>,
    /// Source URL.
    #[serde(default)]
    pub url: Option<String>,
    /// Extracted text used as summarization context.
    #[serde(default)]
    pub content: String,
}

/// HTTP client for the search provider.
pub struct SearchClient {
    client: reqwest::Client,
    search_url: String,
    api_key: Option<String>,
    max_results: usize,
    request_timeout: Duration,
}

impl SearchClient {
    /// Build a client from provider settings.
    pub fn new(config: &SearchClientConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            search_url: config.search_url(),
            api_key: config.api_key.clone(),
            max_results: config.max_results.max(1),
            request_timeout: Duration::from_secs(config.request_timeout_secs.max(1)),
        }
    }

    /// Run one query; returns at most `max_results` hits.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, AnswerError> {
        let body = SearchRequest {
            query,
            api_key: self.api_key.as_deref(),
            max_results: self.max_results,
        };
        let mut req = self
            .client
            .post(&self.search_url)
            .timeout(self.request_timeout)
            .json(&body);
        if let Some(ref key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {key}"));
        }
        let res = req
            .send()
            .await
            .map_err(|e| AnswerError::from_transport(UPSTREAM, &e))?;
        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| AnswerError::from_transport(UPSTREAM, &e))?;
        if !status.is_success() {
            return Err(AnswerError::from_status(UPSTREAM, status, &text));
        }
        let parsed: SearchResponse = serde_json::from_str(&text)
            .map_err(|e| AnswerError::malformed(UPSTREAM, format!("parse error: {e}")))?;
        let mut hits = parsed.results;
        hits.truncate(self.max_results);
        Ok(hits)
    }
}
