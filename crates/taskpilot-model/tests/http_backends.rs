//! Drives the HTTP backends against a local axum server that imitates the
//! OpenAI and Workers AI endpoints.

use std::time::Duration;

use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use taskpilot_model::{
    GenerationParams, ModelClient, ModelError, ModelMessage, ModelRequest, OpenAiClient,
    WorkersAiClient,
};
use tokio_stream::StreamExt;

const TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Fake backend
// =============================================================================

async fn openai_handler(Json(body): Json<Value>) -> impl IntoResponse {
    if body["stream"] == true {
        let sse = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            ": keep-alive\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        ([(header::CONTENT_TYPE, "text/event-stream")], sse).into_response()
    } else {
        let last = body["messages"]
            .as_array()
            .and_then(|m| m.last())
            .and_then(|m| m["content"].as_str())
            .unwrap_or_default()
            .to_string();
        Json(json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": format!("echo: {}", last)}}]
        }))
        .into_response()
    }
}

async fn workers_handler(
    Path((account, model)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    if account == "denied" {
        return (StatusCode::FORBIDDEN, "bad token").into_response();
    }
    if body["stream"] == true {
        let sse = format!(
            "data: {{\"response\":\"{}\"}}\n\ndata: {{\"response\":\" ok\"}}\n\ndata: [DONE]\n\n",
            model
        );
        ([(header::CONTENT_TYPE, "text/event-stream")], sse).into_response()
    } else {
        Json(json!({"result": {"response": format!("max={}", body["max_tokens"])}, "success": true}))
            .into_response()
    }
}

async fn spawn_backend() -> String {
    let app = Router::new()
        .route("/v1/chat/completions", post(openai_handler))
        .route("/accounts/{account}/ai/run/{model}", post(workers_handler));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn request(text: &str) -> ModelRequest {
    ModelRequest::new(
        vec![ModelMessage::system("ctx"), ModelMessage::user(text)],
        GenerationParams {
            max_tokens: 64,
            temperature: 0.2,
        },
    )
}

async fn collect_fragments(client: &dyn ModelClient, text: &str) -> Vec<Option<String>> {
    let mut stream = client.stream(&request(text)).await.unwrap();
    let mut out = Vec::new();
    while let Some(item) = stream.next().await {
        out.push(item.unwrap().response);
    }
    out
}

// =============================================================================
// OpenAI-compatible
// =============================================================================

#[tokio::test]
async fn test_openai_complete() {
    let base = spawn_backend().await;
    let client = OpenAiClient::new(base, Some("sk-test".into()), "test-model", TIMEOUT).unwrap();
    let reply = client.complete(&request("hello")).await.unwrap();
    assert_eq!(reply, "echo: hello");
}

#[tokio::test]
async fn test_openai_stream() {
    let base = spawn_backend().await;
    let client = OpenAiClient::new(base, None, "test-model", TIMEOUT).unwrap();
    let fragments = collect_fragments(&client, "hello").await;
    assert_eq!(
        fragments,
        vec![None, Some("Hel".to_string()), Some("lo".to_string())]
    );
}

// =============================================================================
// Workers AI
// =============================================================================

#[tokio::test]
async fn test_workers_ai_complete_sends_params() {
    let base = spawn_backend().await;
    let client = WorkersAiClient::new(base, "acct", "token", "tiny", TIMEOUT).unwrap();
    let reply = client.complete(&request("hello")).await.unwrap();
    assert_eq!(reply, "max=64");
}

#[tokio::test]
async fn test_workers_ai_stream() {
    let base = spawn_backend().await;
    let client = WorkersAiClient::new(base, "acct", "token", "tiny", TIMEOUT).unwrap();
    let fragments = collect_fragments(&client, "hello").await;
    assert_eq!(
        fragments,
        vec![Some("tiny".to_string()), Some(" ok".to_string())]
    );
}

#[tokio::test]
async fn test_workers_ai_error_status() {
    let base = spawn_backend().await;
    let client = WorkersAiClient::new(base, "denied", "token", "tiny", TIMEOUT).unwrap();

    let err = client.complete(&request("hello")).await.unwrap_err();
    assert!(matches!(err, ModelError::Status { status: 403, ref body } if body == "bad token"));

    let err = client.stream(&request("hello")).await.err().unwrap();
    assert!(matches!(err, ModelError::Status { status: 403, .. }));
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = OpenAiClient::new(format!("http://{}", addr), None, "m", TIMEOUT).unwrap();
    let err = client.complete(&request("hello")).await.unwrap_err();
    assert!(matches!(err, ModelError::Transport(_)));
}
