//! HTTP gateway integration tests: validation (400), dispatch (202/503),
//! status polling (200/404) and health (200/503).
//! Uses in-memory backends and scripted probes so no external services are required.

#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use omni_query::{
    GatewayState, HealthAggregator, JobDispatcher, JobQueue, JobStore, JobTransition,
    MemoryJobQueue, MemoryJobStore, Probe, ProbeError, ProbeSet, router,
};
use serde_json::Value;
use tower::ServiceExt;

struct ScriptedProbe {
    name: &'static str,
    outcome: Result<(), ProbeError>,
}

#[async_trait]
impl Probe for ScriptedProbe {
    fn name(&self) -> &str {
        self.name
    }

    async fn check(&self) -> Result<(), ProbeError> {
        self.outcome.clone()
    }
}

struct TestGateway {
    queue: Arc<MemoryJobQueue>,
    store: Arc<MemoryJobStore>,
    app: Router,
}

fn gateway_with(probes: Vec<ScriptedProbe>) -> TestGateway {
    let queue = Arc::new(MemoryJobQueue::new(8));
    let store = Arc::new(MemoryJobStore::new());
    let mut set = ProbeSet::new(Duration::from_secs(1));
    for probe in probes {
        set.register(Arc::new(probe)).expect("unique probe names");
    }
    let state = GatewayState {
        dispatcher: JobDispatcher::new(
            Arc::clone(&queue) as Arc<dyn JobQueue>,
            Arc::clone(&store) as Arc<dyn JobStore>,
        ),
        health: Arc::new(HealthAggregator::new(set)),
    };
    TestGateway {
        queue,
        store,
        app: router(state),
    }
}

fn healthy_probes() -> Vec<ScriptedProbe> {
    ["database", "broker", "workers", "external_api_a", "external_api_b"]
        .into_iter()
        .map(|name| ScriptedProbe {
            name,
            outcome: Ok(()),
        })
        .collect()
}

fn post_query(uri: &str, body: &'static str) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn submit_returns_202_with_task_id() {
    let gateway = gateway_with(healthy_probes());

    let response = gateway
        .app
        .clone()
        .oneshot(post_query(
            "/api/v1/query/",
            r#"{"query":"capital of France"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = json_body(response).await;
    let task_id = body["task_id"].as_str().expect("string task_id");
    assert!(!task_id.is_empty());

    let record = gateway
        .store
        .get(task_id)
        .await
        .unwrap()
        .expect("record created");
    assert_eq!(record.query, "capital of France");
    assert!(!record.use_web_search);
}

#[tokio::test]
async fn submit_accepts_path_without_trailing_slash_and_web_flag() {
    let gateway = gateway_with(healthy_probes());

    let response = gateway
        .app
        .clone()
        .oneshot(post_query(
            "/api/v1/query",
            r#"{"query":" rust async\n","use_web_search":true}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let unit = gateway
        .queue
        .dequeue(Duration::from_millis(50))
        .await
        .unwrap()
        .expect("unit enqueued");
    assert!(unit.use_web_search);
    assert_eq!(unit.query, " rust async\n");
}

#[tokio::test]
async fn submit_without_query_returns_400() {
    for body in [r"{}", r#"{"query":""}"#, r#"{"query":"   "}"#, r#"{"query":null}"#] {
        let gateway = gateway_with(healthy_probes());
        let response = gateway
            .app
            .clone()
            .oneshot(post_query("/api/v1/query/", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {body}");
        assert_eq!(
            json_body(response).await,
            serde_json::json!({"error": "Query is required"})
        );
        assert!(gateway.store.is_empty().await);
    }
}

#[tokio::test]
async fn submit_with_non_json_body_returns_400() {
    let gateway = gateway_with(healthy_probes());

    let response = gateway
        .app
        .clone()
        .oneshot(post_query("/api/v1/query/", "query=capital"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(gateway.store.is_empty().await);
}

#[tokio::test]
async fn submit_against_closed_queue_returns_503() {
    let gateway = gateway_with(healthy_probes());
    gateway.queue.close();

    let response = gateway
        .app
        .clone()
        .oneshot(post_query("/api/v1/query/", r#"{"query":"hello"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        json_body(response).await,
        serde_json::json!({"error": "Task queue unavailable"})
    );
    assert!(gateway.store.is_empty().await);
}

#[tokio::test]
async fn status_reports_record_lifecycle() {
    let gateway = gateway_with(healthy_probes());
    let response = gateway
        .app
        .clone()
        .oneshot(post_query("/api/v1/query/", r#"{"query":"hello"}"#))
        .await
        .unwrap();
    let task_id = json_body(response).await["task_id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = gateway
        .app
        .clone()
        .oneshot(
            Request::get(format!("/api/v1/query/{task_id}/"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["task_id"], task_id.as_str());
    assert_eq!(body["status"], "PENDING");
    assert!(body["result"].is_null());
    assert!(body["error"].is_null());
    assert!(body["created_at"].is_string());
    assert!(body["started_at"].is_null());

    gateway
        .store
        .transition(&task_id, JobTransition::Start)
        .await
        .unwrap();
    gateway
        .store
        .transition(&task_id, JobTransition::Succeed("Paris".to_string()))
        .await
        .unwrap();

    let response = gateway
        .app
        .clone()
        .oneshot(
            Request::get(format!("/api/v1/query/{task_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "SUCCEEDED");
    assert_eq!(body["result"], "Paris");
    assert!(body["finished_at"].is_string());
}

#[tokio::test]
async fn status_for_unknown_task_returns_404() {
    let gateway = gateway_with(healthy_probes());

    let response = gateway
        .app
        .oneshot(
            Request::get("/api/v1/query/does-not-exist/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        json_body(response).await,
        serde_json::json!({"error": "Task not found"})
    );
}

#[tokio::test]
async fn health_returns_200_when_every_component_is_healthy() {
    let gateway = gateway_with(healthy_probes());

    let response = gateway
        .app
        .oneshot(Request::get("/api/v1/health/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    let components = body["components"].as_object().expect("components map");
    assert_eq!(components.len(), 5);
    for component in components.values() {
        assert_eq!(component["status"], "healthy");
        assert!(component["error"].is_null());
    }
}

#[tokio::test]
async fn health_returns_503_when_broker_is_unreachable() {
    let probes = healthy_probes()
        .into_iter()
        .map(|probe| {
            if probe.name == "broker" {
                ScriptedProbe {
                    name: "broker",
                    outcome: Err(ProbeError::Unreachable("connection refused".to_string())),
                }
            } else {
                probe
            }
        })
        .collect();
    let gateway = gateway_with(probes);

    let response = gateway
        .app
        .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["components"]["broker"]["status"], "unhealthy");
    assert_eq!(body["components"]["broker"]["error"], "connection refused");
    for name in ["database", "workers", "external_api_a", "external_api_b"] {
        assert_eq!(body["components"][name]["status"], "healthy", "{name}");
    }
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let gateway = gateway_with(healthy_probes());

    let response = gateway
        .app
        .oneshot(Request::get("/unknown").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
