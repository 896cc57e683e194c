//! Provider endpoints and credentials for the answering capability.

/// Default OpenAI-compatible API base.
pub const OPENAI_DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
/// Default Tavily-compatible search API base.
pub const SEARCH_DEFAULT_BASE_URL: &str = "https://api.tavily.com";
/// Default chat model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
/// Search hits requested per query.
pub const DEFAULT_SEARCH_MAX_RESULTS: usize = 5;
/// Per-request timeout for provider calls.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Chat-completions provider settings.
#[derive(Debug, Clone)]
pub struct LlmClientConfig {
    /// API base, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    /// Model id sent with every request.
    pub model: String,
    /// Bearer token.
    pub api_key: Option<String>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for LlmClientConfig {
    fn default() -> Self {
        Self {
            base_url: OPENAI_DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl LlmClientConfig {
    /// `POST` target for chat completions.
    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", trim_base(&self.base_url))
    }

    /// `GET` target listing models; cheap reachability check.
    pub fn models_url(&self) -> String {
        format!("{}/models", trim_base(&self.base_url))
    }
}

/// Web search provider settings.
#[derive(Debug, Clone)]
pub struct SearchClientConfig {
    /// API base, e.g. `https://api.tavily.com`.
    pub base_url: String,
    /// API key, sent both in the body and as bearer token.
    pub api_key: Option<String>,
    /// Hits requested per query.
    pub max_results: usize,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for SearchClientConfig {
    fn default() -> Self {
        Self {
            base_url: SEARCH_DEFAULT_BASE_URL.to_string(),
            api_key: None,
            max_results: DEFAULT_SEARCH_MAX_RESULTS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl SearchClientConfig {
    /// `POST` target for search queries.
    pub fn search_url(&self) -> String {
        format!("{}/search", trim_base(&self.base_url))
    }
}

/// Full capability configuration. `search: None` disables web search.
#[derive(Debug, Clone, Default)]
pub struct AnswerConfig {
    /// Chat provider.
    pub llm: LlmClientConfig,
    /// Optional search provider.
    pub search: Option<SearchClientConfig>,
}

fn trim_base(base: &str) -> &str {
    base.trim().trim_end_matches('/')
}
