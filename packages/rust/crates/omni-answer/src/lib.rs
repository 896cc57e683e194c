//! Answering capability for omni-query.
//!
//! A query is summarized by an OpenAI-compatible chat model, optionally after
//! collecting context from a Tavily-compatible web search. Failures are
//! classified ([`FaultKind`]) so job records can tell retryable upstream
//! trouble apart from terminal faults.

mod capability;
mod config;
mod error;
mod llm;
mod prompt;
mod search;

pub use capability::{AnsweringCapability, Summarizer};
pub use config::{
    AnswerConfig, DEFAULT_MODEL, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SEARCH_MAX_RESULTS,
    LlmClientConfig, OPENAI_DEFAULT_BASE_URL, SEARCH_DEFAULT_BASE_URL, SearchClientConfig,
};
pub use error::{AnswerError, FaultKind};
pub use llm::LlmClient;
pub use prompt::{direct_prompt, join_web_content, web_prompt};
pub use search::{SearchClient, SearchHit};
