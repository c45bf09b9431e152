//! Turn pipeline: one inbound message in, one assistant reply out.
//!
//! Each turn loads the session, records the user message, applies any task
//! command, renders the system prompt, calls the model, records the reply,
//! trims the transcript and persists. Batch turns return a [`ChatReply`];
//! streamed turns return a channel of [`StreamEvent`]s fed by a producer
//! task.

use std::sync::Arc;

use chrono::{DateTime, Local};
use tokio::sync::{mpsc, OwnedMutexGuard};
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

use taskpilot_core::config::ChatConfig;
use taskpilot_core::types::{Role, SessionState, Task};
use taskpilot_intent::{extract, CommandOutcome};
use taskpilot_model::{GenerationParams, ModelClient, ModelMessage, ModelRequest};
use taskpilot_storage::SessionStore;

use crate::context::render_context;
use crate::error::ChatError;
use crate::locks::SessionLocks;
use crate::types::{ChatReply, StreamEvent};

/// Reply recorded when the model call fails in batch mode.
pub const APOLOGY_REPLY: &str = "I apologize, I encountered an error. Please try again.";

/// Reply recorded when the model returns nothing in batch mode.
pub const FALLBACK_REPLY: &str = "I'm here to help!";

/// Events buffered between the producer and the response writer.
const STREAM_BUFFER: usize = 64;

/// Source of "now" for date inference and context rendering.
pub type Clock = Arc<dyn Fn() -> DateTime<Local> + Send + Sync>;

/// A turn that has been through steps up to building the model request.
struct PreparedTurn {
    state: SessionState,
    request: ModelRequest,
    guard: Option<OwnedMutexGuard<()>>,
}

/// Orchestrates chat turns against a session store and a model.
#[derive(Clone)]
pub struct TurnPipeline {
    store: Arc<dyn SessionStore>,
    model: Arc<dyn ModelClient>,
    config: ChatConfig,
    params: GenerationParams,
    locks: Option<Arc<SessionLocks>>,
    clock: Clock,
}

impl TurnPipeline {
    pub fn new(
        store: Arc<dyn SessionStore>,
        model: Arc<dyn ModelClient>,
        config: ChatConfig,
        params: GenerationParams,
    ) -> Self {
        let locks = config
            .serialize_turns
            .then(|| Arc::new(SessionLocks::new()));
        Self {
            store,
            model,
            config,
            params,
            locks,
            clock: Arc::new(Local::now),
        }
    }

    /// Replace the wall clock.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    // -----------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------

    /// Run a batch turn.
    ///
    /// Model failures become [`APOLOGY_REPLY`] and the turn still persists.
    /// Storage failures abort the turn.
    pub async fn handle_message(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<ChatReply, ChatError> {
        let PreparedTurn {
            state,
            request,
            guard: _guard,
        } = self.prepare(session_id, message).await?;

        let reply = match self.model.complete(&request).await {
            Ok(text) if text.is_empty() => FALLBACK_REPLY.to_string(),
            Ok(text) => text,
            Err(e) => {
                warn!(session_id, model = self.model.model_id(), error = %e, "Model call failed");
                APOLOGY_REPLY.to_string()
            }
        };

        let state = self.finish(session_id, state, reply.clone()).await?;
        Ok(ChatReply {
            role: Role::Assistant,
            content: reply,
            tasks: state.tasks,
        })
    }

    /// Run a streamed turn.
    ///
    /// Validation and loading happen before this returns, so those errors
    /// are reported directly. Everything after arrives on the channel: one
    /// `Tasks` event, `Token`s, then `Done` once the turn is persisted or
    /// `Error` if the model or storage fails. A failed or abandoned stream
    /// persists nothing.
    pub async fn handle_message_stream(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<mpsc::Receiver<StreamEvent>, ChatError> {
        let turn = self.prepare(session_id, message).await?;
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);

        let pipeline = self.clone();
        let session_id = session_id.to_string();
        tokio::spawn(async move {
            pipeline.produce(session_id, turn, tx).await;
        });

        Ok(rx)
    }

    /// Current task list for a session. Unknown sessions have no tasks.
    pub async fn tasks(&self, session_id: &str) -> Result<Vec<Task>, ChatError> {
        if session_id.trim().is_empty() {
            return Err(ChatError::MissingSession);
        }
        let state = self
            .store
            .load(session_id)
            .await
            .map_err(|e| storage_error(session_id, e))?;
        Ok(state.tasks)
    }

    // -----------------------------------------------------------------
    // Steps
    // -----------------------------------------------------------------

    fn validate(&self, session_id: &str, message: &str) -> Result<(), ChatError> {
        if session_id.trim().is_empty() {
            return Err(ChatError::MissingSession);
        }
        if message.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if message.chars().count() > self.config.max_message_length {
            return Err(ChatError::MessageTooLong(self.config.max_message_length));
        }
        Ok(())
    }

    /// Validate, load, record the user turn, apply commands and build the
    /// model request.
    async fn prepare(&self, session_id: &str, message: &str) -> Result<PreparedTurn, ChatError> {
        self.validate(session_id, message)?;

        let guard = match &self.locks {
            Some(locks) => Some(locks.acquire(session_id).await),
            None => None,
        };

        let mut state = self
            .store
            .load(session_id)
            .await
            .map_err(|e| storage_error(session_id, e))?;

        state.push_turn(Role::User, message);

        let now = (self.clock)();
        match extract(message, &mut state.tasks, &now) {
            CommandOutcome::Added(id) => info!(session_id, task_id = %id, "Task added"),
            CommandOutcome::Completed(n) => info!(session_id, position = n, "Task completed"),
            CommandOutcome::Deleted(n) => info!(session_id, position = n, "Task deleted"),
            CommandOutcome::Ignored => debug!(session_id, "No task command"),
        }

        let context = render_context(&state.tasks, &now);
        let mut messages = Vec::with_capacity(self.config.history_window + 1);
        messages.push(ModelMessage::system(context));
        messages.extend(
            state
                .recent_turns(self.config.history_window)
                .iter()
                .map(ModelMessage::from),
        );

        Ok(PreparedTurn {
            state,
            request: ModelRequest::new(messages, self.params),
            guard,
        })
    }

    /// Record the reply, trim and persist.
    async fn finish(
        &self,
        session_id: &str,
        mut state: SessionState,
        reply: String,
    ) -> Result<SessionState, ChatError> {
        state.push_turn(Role::Assistant, reply);
        state.trim_transcript(self.config.transcript_limit);
        self.store
            .put(session_id, &state)
            .await
            .map_err(|e| storage_error(session_id, e))?;
        debug!(
            session_id,
            tasks = state.tasks.len(),
            turns = state.conversations.len(),
            "Turn persisted"
        );
        Ok(state)
    }

    /// Streaming producer. Owns the session guard until it returns.
    async fn produce(self, session_id: String, turn: PreparedTurn, tx: mpsc::Sender<StreamEvent>) {
        let PreparedTurn {
            state,
            request,
            guard: _guard,
        } = turn;

        let tasks = StreamEvent::Tasks {
            tasks: state.tasks.clone(),
        };
        if tx.send(tasks).await.is_err() {
            debug!(session_id = %session_id, "Stream receiver dropped before start");
            return;
        }

        let mut chunks = match self.model.stream(&request).await {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!(session_id = %session_id, model = self.model.model_id(), error = %e, "Model stream failed to start");
                let _ = tx.send(StreamEvent::Error { message: e.to_string() }).await;
                return;
            }
        };

        let mut reply = String::new();
        loop {
            // A stalled model must not outlive its reader.
            let next = tokio::select! {
                next = chunks.next() => next,
                _ = tx.closed() => {
                    debug!(session_id = %session_id, "Stream receiver dropped while waiting on model");
                    return;
                }
            };
            let Some(item) = next else {
                break;
            };
            match item {
                Ok(chunk) => {
                    let Some(fragment) = chunk.response.filter(|f| !f.is_empty()) else {
                        continue;
                    };
                    reply.push_str(&fragment);
                    if tx.send(StreamEvent::Token { content: fragment }).await.is_err() {
                        debug!(session_id = %session_id, "Stream receiver dropped, discarding turn");
                        return;
                    }
                }
                Err(e) => {
                    warn!(session_id = %session_id, error = %e, "Model stream failed mid-reply");
                    let _ = tx.send(StreamEvent::Error { message: e.to_string() }).await;
                    return;
                }
            }
        }

        if tx.is_closed() {
            debug!(session_id = %session_id, "Stream receiver dropped, discarding turn");
            return;
        }

        let terminal = match self.finish(&session_id, state, reply).await {
            Ok(_) => StreamEvent::Done,
            Err(e) => StreamEvent::Error {
                message: e.to_string(),
            },
        };
        let _ = tx.send(terminal).await;
    }
}

fn storage_error(session_id: &str, err: taskpilot_core::TaskpilotError) -> ChatError {
    error!(session_id, error = %err, "Session storage failed");
    ChatError::from(err)
}
