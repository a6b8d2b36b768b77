//! Tests for the OpenAI-compatible backend against an in-process stub server.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use investor_casebook::casebook::Case;
use investor_casebook::config::RunnerConfig;
use investor_casebook::inference::{BackendError, OpenAiBackend, SamplingConfig, TextGenerator};
use investor_casebook::runner::{CasebookRunner, RunnerError};

async fn list_models() -> Json<Value> {
    Json(json!({
        "object": "list",
        "data": [{"id": "test-model", "object": "model", "created": 0, "owned_by": "local"}]
    }))
}

/// Echo the prompt and sampling parameters back as the completion.
async fn echo_completion(Json(req): Json<Value>) -> Json<Value> {
    let content = format!(
        "model={} temperature={} top_p={} max_tokens={} prompt={}",
        req["model"].as_str().unwrap_or(""),
        req["temperature"],
        req["top_p"],
        req["max_tokens"],
        req["messages"][0]["content"].as_str().unwrap_or(""),
    );
    Json(json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 0,
        "model": req["model"],
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2}
    }))
}

async fn oom_completion() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "CUDA error: out of memory")
}

async fn empty_completion() -> Json<Value> {
    Json(json!({"id": "chatcmpl-empty", "choices": []}))
}

async fn spawn_server(completions: Router) -> String {
    let app = Router::new()
        .route("/v1/models", get(list_models))
        .merge(completions);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn ready_backend(completions: Router) -> OpenAiBackend {
    let endpoint = spawn_server(completions).await;
    let mut backend = OpenAiBackend::new(&endpoint, "test-model", Duration::from_secs(5)).unwrap();
    let info = backend.initialize().await.unwrap();
    assert_eq!(info.available_models, vec!["test-model".to_string()]);
    assert!(backend.is_ready());
    backend
}

fn case() -> Case {
    Case {
        id: "PM-001".to_string(),
        category: "Test".to_string(),
        prompt: "X".to_string(),
        golden_answer: "Y".to_string(),
    }
}

#[tokio::test]
async fn test_generate_sends_prompt_and_sampling() {
    let backend =
        ready_backend(Router::new().route("/v1/chat/completions", post(echo_completion))).await;

    let sampling = SamplingConfig::default();
    let text = backend.generate("hello desk", &sampling).await.unwrap();

    assert!(text.contains("model=test-model"));
    assert!(text.contains("temperature=0.1"));
    assert!(text.contains("top_p=0.9"));
    assert!(text.contains("max_tokens=512"));
    assert!(text.ends_with("prompt=hello desk"));
}

#[tokio::test]
async fn test_runner_over_http_backend() {
    let backend =
        ready_backend(Router::new().route("/v1/chat/completions", post(echo_completion))).await;
    let runner = CasebookRunner::new(RunnerConfig::default(), Arc::new(backend)).unwrap();

    let result = runner.run_case(&case()).await.unwrap();
    assert_eq!(result.case_id, "PM-001");
    assert_eq!(result.golden_answer, "Y");
    assert!(result.generated_text.contains("ANALYST CASE PM-001: X"));
}

#[tokio::test]
async fn test_out_of_memory_surfaces_as_inference_error() {
    let backend =
        ready_backend(Router::new().route("/v1/chat/completions", post(oom_completion))).await;
    let runner = CasebookRunner::new(RunnerConfig::default(), Arc::new(backend)).unwrap();

    match runner.run_case(&case()).await {
        Err(RunnerError::Inference { case_id, source }) => {
            assert_eq!(case_id, "PM-001");
            assert!(matches!(source, BackendError::OutOfMemory(_)));
        }
        other => panic!("expected inference error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_response_without_choices_is_invalid() {
    let backend =
        ready_backend(Router::new().route("/v1/chat/completions", post(empty_completion))).await;
    let err = backend.generate("x", &SamplingConfig::default()).await.unwrap_err();
    assert!(matches!(err, BackendError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_initialize_fails_when_server_unreachable() {
    // Bind then drop to get a port with nothing listening.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut backend =
        OpenAiBackend::new(&format!("http://{addr}"), "test-model", Duration::from_secs(2)).unwrap();
    let err = backend.initialize().await.unwrap_err();
    assert!(matches!(err, BackendError::Transport(_)));
    assert!(!backend.is_ready());
}
