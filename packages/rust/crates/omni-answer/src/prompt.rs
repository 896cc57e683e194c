//! Prompt templates for the two answering shapes.

use crate::search::SearchHit;

/// Prompt used when no web context is requested.
pub fn direct_prompt(query: &str) -> String {
    format!("Summarize the following query concisely: {query}")
}

/// Prompt used with web search context.
pub fn web_prompt(query: &str, web_content: &str) -> String {
    format!(
        "User query: {query}\nWeb results: {web_content}\nSummarize the web results concisely and explain in simple terms."
    )
}

/// Join hit contents, one per line, in provider order.
pub fn join_web_content(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| hit.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
