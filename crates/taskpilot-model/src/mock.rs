//! Scripted model used offline and in tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::ModelError;
use crate::types::{ModelChunk, ModelRequest};
use crate::{ChunkStream, ModelClient};

/// Reply used when no model provider is configured.
pub const OFFLINE_REPLY: &str = "I'm running without a language model right now, but I can still \
manage your list. Try \"add task: call the dentist tomorrow\", \"complete 1\" or \"delete task 2\".";

#[derive(Debug, Clone)]
enum Script {
    Reply(String),
    Chunks(Vec<Option<String>>),
    Fail(String),
    FailMidStream { chunks: Vec<String>, message: String },
}

/// A [`ModelClient`] that answers from a fixed script and records every
/// request it receives.
pub struct ScriptedModel {
    script: Script,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    fn with_script(script: Script) -> Self {
        Self {
            script,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always replies with `text`. Streams it word by word.
    pub fn replying(text: impl Into<String>) -> Self {
        Self::with_script(Script::Reply(text.into()))
    }

    /// The offline fallback model.
    pub fn offline() -> Self {
        Self::replying(OFFLINE_REPLY)
    }

    /// Streams exactly these chunks; `None` is a chunk with no text.
    /// Batch calls return the concatenation.
    pub fn chunked<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self::with_script(Script::Chunks(
            chunks.into_iter().map(|c| c.map(Into::into)).collect(),
        ))
    }

    /// Every call fails before producing output.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_script(Script::Fail(message.into()))
    }

    /// Streams `chunks`, then fails. Batch calls fail outright.
    pub fn failing_mid_stream<I, S>(chunks: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_script(Script::FailMidStream {
            chunks: chunks.into_iter().map(Into::into).collect(),
            message: message.into(),
        })
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn record(&self, request: &ModelRequest) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
    }
}

/// Split text into word fragments that concatenate back to the original.
fn word_fragments(text: &str) -> Vec<String> {
    text.split_inclusive(' ').map(str::to_string).collect()
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn complete(&self, request: &ModelRequest) -> Result<String, ModelError> {
        self.record(request);
        match &self.script {
            Script::Reply(text) => Ok(text.clone()),
            Script::Chunks(chunks) => Ok(chunks.iter().flatten().map(String::as_str).collect()),
            Script::Fail(message) | Script::FailMidStream { message, .. } => {
                Err(ModelError::Transport(message.clone()))
            }
        }
    }

    async fn stream(&self, request: &ModelRequest) -> Result<ChunkStream, ModelError> {
        self.record(request);
        let items: Vec<Result<ModelChunk, ModelError>> = match &self.script {
            Script::Reply(text) => word_fragments(text)
                .into_iter()
                .map(|f| Ok(ModelChunk::text(f)))
                .collect(),
            Script::Chunks(chunks) => chunks
                .iter()
                .map(|c| {
                    Ok(ModelChunk {
                        response: c.clone(),
                    })
                })
                .collect(),
            Script::Fail(message) => return Err(ModelError::Transport(message.clone())),
            Script::FailMidStream { chunks, message } => chunks
                .iter()
                .map(|c| Ok(ModelChunk::text(c.clone())))
                .chain(std::iter::once(Err(ModelError::Stream(message.clone()))))
                .collect(),
        };
        Ok(Box::pin(tokio_stream::iter(items)))
    }

    fn model_id(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GenerationParams, ModelMessage};
    use tokio_stream::StreamExt;

    fn request(text: &str) -> ModelRequest {
        ModelRequest::new(vec![ModelMessage::user(text)], GenerationParams::default())
    }

    async fn collect_text(mut stream: ChunkStream) -> (String, Option<ModelError>) {
        let mut text = String::new();
        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) => text.push_str(chunk.response.as_deref().unwrap_or("")),
                Err(e) => return (text, Some(e)),
            }
        }
        (text, None)
    }

    #[tokio::test]
    async fn test_replying_batch_and_stream_agree() {
        let model = ScriptedModel::replying("You have two tasks today.");
        let batch = model.complete(&request("hi")).await.unwrap();
        let (streamed, err) = collect_text(model.stream(&request("hi")).await.unwrap()).await;
        assert_eq!(batch, "You have two tasks today.");
        assert_eq!(streamed, batch);
        assert!(err.is_none());
    }

    #[tokio::test]
    async fn test_replying_streams_word_fragments() {
        let model = ScriptedModel::replying("a b c");
        let items: Vec<_> = model.stream(&request("x")).await.unwrap().collect().await;
        assert_eq!(items.len(), 3);
    }

    #[tokio::test]
    async fn test_chunked_includes_empty_chunks() {
        let model = ScriptedModel::chunked(vec![Some("Hel"), None, Some("lo")]);
        let items: Vec<_> = model.stream(&request("x")).await.unwrap().collect().await;
        assert_eq!(items.len(), 3);
        assert_eq!(model.complete(&request("x")).await.unwrap(), "Hello");
    }

    #[tokio::test]
    async fn test_failing() {
        let model = ScriptedModel::failing("boom");
        assert!(model.complete(&request("x")).await.is_err());
        assert!(model.stream(&request("x")).await.is_err());
    }

    #[tokio::test]
    async fn test_failing_mid_stream() {
        let model = ScriptedModel::failing_mid_stream(["Par", "tial"], "connection reset");
        let (text, err) = collect_text(model.stream(&request("x")).await.unwrap()).await;
        assert_eq!(text, "Partial");
        assert!(matches!(err, Some(ModelError::Stream(_))));
    }

    #[tokio::test]
    async fn test_records_requests() {
        let model = ScriptedModel::offline();
        model.complete(&request("first")).await.unwrap();
        model.stream(&request("second")).await.unwrap();
        let requests = model.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].messages[0].content, "second");
    }
}
