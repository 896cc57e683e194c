//! LLM client: OpenAI-compatible chat completions, single user turn.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::LlmClientConfig;
use crate::error::AnswerError;

const UPSTREAM: &str = "llm";

/// Request body for chat completions (OpenAI format).
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Response: choices[0].message.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP client for chat completions.
pub struct LlmClient {
    client: reqwest::Client,
    completions_url: String,
    model: String,
    api_key: Option<String>,
    request_timeout: Duration,
}

impl LlmClient {
    /// Build a client from provider settings.
    pub fn new(config: &LlmClientConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            completions_url: config.chat_completions_url(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_secs.max(1)),
        }
    }

    /// Model id used for requests.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one user prompt; returns the assistant's text.
    pub async fn complete(&self, prompt: &str) -> Result<String, AnswerError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };
        let mut req = self
            .client
            .post(&self.completions_url)
            .timeout(self.request_timeout)
            .json(&body)
            .header("Content-Type", "application/json");
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
        let parsed: ChatCompletionResponse = serde_json::from_str(&text)
            .map_err(|e| AnswerError::malformed(UPSTREAM, format!("parse error: {e}")))?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AnswerError::malformed(UPSTREAM, "response has no choices"))?;
        choice
            .message
            .content
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AnswerError::malformed(UPSTREAM, "response message has no content"))
    }
}
