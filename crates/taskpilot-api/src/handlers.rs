//! Route handler functions for all API endpoints.

use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use taskpilot_chat::ChatReply;
use taskpilot_core::types::Task;

use crate::error::ApiError;
use crate::state::AppState;

/// Session used when a request does not name one.
pub const DEFAULT_SESSION: &str = "default";

/// Plain-text body served at `/` and for unknown paths.
pub const BANNER: &str = "AI Task Assistant API";

// =============================================================================
// Request and response types
// =============================================================================

/// Body of `POST /api/chat` and `POST /api/chat/stream`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TasksParams {
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TasksResponse {
    pub tasks: Vec<Task>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Blank or missing session ids fall back to [`DEFAULT_SESSION`].
fn session_or_default(session_id: Option<String>) -> String {
    session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SESSION.to_string())
}

// =============================================================================
// Chat
// =============================================================================

/// POST /api/chat - run one batch turn.
pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    let session_id = session_or_default(body.session_id);
    let message = body.message.unwrap_or_default();

    let reply = state
        .pipeline
        .handle_message(&session_id, &message)
        .await?;
    Ok(Json(reply))
}

/// POST /api/chat/stream - run one streamed turn as server-sent events.
///
/// Each event is a `data:` line holding one JSON stream event. The response
/// ends after the terminal `done` or `error` event.
pub async fn chat_stream(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, axum::Error>> + Send>, ApiError> {
    let session_id = session_or_default(body.session_id);
    let message = body.message.unwrap_or_default();

    let rx = state
        .pipeline
        .handle_message_stream(&session_id, &message)
        .await?;
    tracing::debug!(session_id = %session_id, "Streaming turn started");

    let stream = ReceiverStream::new(rx).map(|event| Event::default().json_data(&event));
    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

// =============================================================================
// Tasks
// =============================================================================

/// GET /api/tasks - current task list of a session.
pub async fn tasks(
    State(state): State<AppState>,
    Query(params): Query<TasksParams>,
) -> Result<Json<TasksResponse>, ApiError> {
    let session_id = session_or_default(params.session_id);
    let tasks = state.pipeline.tasks(&session_id).await?;
    Ok(Json(TasksResponse { tasks }))
}

// =============================================================================
// Misc
// =============================================================================

/// GET /health - health check.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET / and any unknown path.
pub async fn banner() -> &'static str {
    BANNER
}
