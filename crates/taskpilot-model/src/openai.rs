//! OpenAI-compatible chat-completions backend.
//!
//! Works against api.openai.com and any server exposing the same
//! `/v1/chat/completions` surface (llama.cpp, vLLM, Ollama).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::ModelError;
use crate::http::{check_status, spawn_sse_reader};
use crate::types::{ModelMessage, ModelRequest};
use crate::{ChunkStream, ModelClient};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ModelMessage],
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    timeout: Duration,
}

impl OpenAiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        let http = Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| ModelError::Config(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn body<'a>(&'a self, request: &'a ModelRequest, stream: bool) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.model,
            messages: &request.messages,
            max_tokens: request.params.max_tokens,
            temperature: request.params.temperature,
            stream,
        }
    }

    fn post(&self) -> reqwest::RequestBuilder {
        let builder = self.http.post(self.endpoint());
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

/// `choices[0].delta.content` from a streaming payload.
fn delta_content(value: &Value) -> Option<String> {
    value
        .pointer("/choices/0/delta/content")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn complete(&self, request: &ModelRequest) -> Result<String, ModelError> {
        debug!(model = %self.model, messages = request.messages.len(), "Chat completion request");
        let response = self
            .post()
            .timeout(self.timeout)
            .json(&self.body(request, false))
            .send()
            .await?;
        let response = check_status(response).await?;
        let parsed: ChatCompletionResponse = response.json().await?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }

    async fn stream(&self, request: &ModelRequest) -> Result<ChunkStream, ModelError> {
        debug!(model = %self.model, messages = request.messages.len(), "Streaming chat completion request");
        let response = self.post().json(&self.body(request, true)).send().await?;
        let response = check_status(response).await?;
        Ok(spawn_sse_reader(response, delta_content))
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
