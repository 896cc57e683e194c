//! Summarizer integration tests against local mock providers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use omni_answer::{
    AnswerConfig, AnsweringCapability, FaultKind, LlmClientConfig, SearchClientConfig, Summarizer,
};
use serde_json::{Value, json};

#[derive(Clone, Default)]
struct MockState {
    prompts: Arc<Mutex<Vec<String>>>,
    search_bodies: Arc<Mutex<Vec<Value>>>,
    auth_headers: Arc<Mutex<Vec<String>>>,
    llm_status: Option<u16>,
    llm_raw_body: Option<&'static str>,
    llm_delay: Option<Duration>,
}

async fn handle_chat(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        state.auth_headers.lock().unwrap().push(auth.to_string());
    }
    let prompt = body["messages"][0]["content"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    state.prompts.lock().unwrap().push(prompt);
    if let Some(delay) = state.llm_delay {
        tokio::time::sleep(delay).await;
    }
    if let Some(code) = state.llm_status {
        let status = StatusCode::from_u16(code).unwrap();
        return (status, r#"{"error":"mock failure"}"#.to_string());
    }
    if let Some(raw) = state.llm_raw_body {
        return (StatusCode::OK, raw.to_string());
    }
    let reply = json!({
        "choices": [{"message": {"role": "assistant", "content": "Paris."}, "finish_reason": "stop"}]
    });
    (StatusCode::OK, reply.to_string())
}

async fn handle_search(State(state): State<MockState>, Json(body): Json<Value>) -> Json<Value> {
    state.search_bodies.lock().unwrap().push(body);
    Json(json!({
        "results": [
            {"title": "a", "url": "https://a.example", "content": "Paris is the capital of France."},
            {"title": "b", "url": "https://b.example", "content": "It sits on the Seine."}
        ]
    }))
}

async fn spawn_provider(state: MockState) -> Option<String> {
    let app = Router::new()
        .route("/v1/chat/completions", post(handle_chat))
        .route("/search", post(handle_search))
        .with_state(state);
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => listener,
        Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
            eprintln!("skipping summarizer tests: local socket bind is not permitted");
            return None;
        }
        Err(err) => panic!("bind mock provider: {err}"),
    };
    let addr = listener.local_addr().expect("mock provider addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Some(format!("http://{addr}"))
}

fn config_for(base_url: &str, with_search: bool, request_timeout_secs: u64) -> AnswerConfig {
    AnswerConfig {
        llm: LlmClientConfig {
            base_url: format!("{base_url}/v1"),
            model: "gpt-4o-mini".to_string(),
            api_key: Some("sk-test".to_string()),
            request_timeout_secs,
        },
        search: with_search.then(|| SearchClientConfig {
            base_url: base_url.to_string(),
            api_key: Some("tvly-test".to_string()),
            max_results: 5,
            request_timeout_secs,
        }),
    }
}

#[tokio::test]
async fn direct_answer_uses_summary_prompt() -> Result<()> {
    let state = MockState::default();
    let Some(base_url) = spawn_provider(state.clone()).await else {
        return Ok(());
    };
    let summarizer = Summarizer::from_config(&config_for(&base_url, false, 5));

    let answer = summarizer.answer("capital of France", false).await?;

    assert_eq!(answer, "Paris.");
    let prompts = state.prompts.lock().unwrap().clone();
    assert_eq!(
        prompts,
        vec!["Summarize the following query concisely: capital of France".to_string()]
    );
    assert_eq!(
        state.auth_headers.lock().unwrap().as_slice(),
        ["Bearer sk-test".to_string()]
    );
    assert!(state.search_bodies.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn web_answer_feeds_search_hits_into_prompt() -> Result<()> {
    let state = MockState::default();
    let Some(base_url) = spawn_provider(state.clone()).await else {
        return Ok(());
    };
    let summarizer = Summarizer::from_config(&config_for(&base_url, true, 5));

    let answer = summarizer.answer("capital of France", true).await?;

    assert_eq!(answer, "Paris.");
    let searches = state.search_bodies.lock().unwrap().clone();
    assert_eq!(searches.len(), 1);
    assert_eq!(searches[0]["query"], "capital of France");
    assert_eq!(searches[0]["api_key"], "tvly-test");
    assert_eq!(searches[0]["max_results"], 5);

    let prompts = state.prompts.lock().unwrap().clone();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains(
        "Web results: Paris is the capital of France.\nIt sits on the Seine.\n"
    ));
    Ok(())
}

#[tokio::test]
async fn web_answer_without_search_provider_is_unavailable() -> Result<()> {
    let state = MockState::default();
    let Some(base_url) = spawn_provider(state.clone()).await else {
        return Ok(());
    };
    let summarizer = Summarizer::from_config(&config_for(&base_url, false, 5));
    assert!(!summarizer.web_search_enabled());

    let error = summarizer
        .answer("capital of France", true)
        .await
        .expect_err("web search should be unavailable");

    assert_eq!(error.kind(), FaultKind::CapabilityUnavailable);
    assert!(state.prompts.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn upstream_faults_are_classified() -> Result<()> {
    let overloaded = MockState {
        llm_status: Some(503),
        ..MockState::default()
    };
    let Some(base_url) = spawn_provider(overloaded).await else {
        return Ok(());
    };
    let error = Summarizer::from_config(&config_for(&base_url, false, 5))
        .answer("q", false)
        .await
        .expect_err("503 should fail");
    assert_eq!(error.kind(), FaultKind::CapabilityUnavailable);
    assert!(error.is_retryable());

    let unauthorized = MockState {
        llm_status: Some(401),
        ..MockState::default()
    };
    let Some(base_url) = spawn_provider(unauthorized).await else {
        return Ok(());
    };
    let error = Summarizer::from_config(&config_for(&base_url, false, 5))
        .answer("q", false)
        .await
        .expect_err("401 should fail");
    assert_eq!(error.kind(), FaultKind::UpstreamRejected);
    assert!(!error.is_retryable());

    let garbled = MockState {
        llm_raw_body: Some(r#"{"unexpected": true}"#),
        ..MockState::default()
    };
    let Some(base_url) = spawn_provider(garbled).await else {
        return Ok(());
    };
    let error = Summarizer::from_config(&config_for(&base_url, false, 5))
        .answer("q", false)
        .await
        .expect_err("malformed body should fail");
    assert_eq!(error.kind(), FaultKind::MalformedResponse);
    Ok(())
}

#[tokio::test]
async fn slow_provider_is_classified_as_timeout() -> Result<()> {
    let slow = MockState {
        llm_delay: Some(Duration::from_millis(1_500)),
        ..MockState::default()
    };
    let Some(base_url) = spawn_provider(slow).await else {
        return Ok(());
    };
    let error = Summarizer::from_config(&config_for(&base_url, false, 1))
        .answer("q", false)
        .await
        .expect_err("slow provider should time out");
    assert_eq!(error.kind(), FaultKind::UpstreamTimeout);
    Ok(())
}
