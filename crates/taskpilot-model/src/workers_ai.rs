//! Cloudflare Workers AI backend.

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

pub const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

#[derive(Serialize)]
struct RunRequest<'a> {
    messages: &'a [ModelMessage],
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct RunResponse {
    #[serde(default)]
    result: Option<RunResult>,
    #[serde(default)]
    errors: Vec<Value>,
}

#[derive(Deserialize)]
struct RunResult {
    #[serde(default)]
    response: Option<String>,
}

pub struct WorkersAiClient {
    http: Client,
    base_url: String,
    account_id: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl WorkersAiClient {
    pub fn new(
        base_url: impl Into<String>,
        account_id: impl Into<String>,
        api_key: impl Into<String>,
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
            account_id: account_id.into(),
            api_key: api_key.into(),
            model: model.into(),
            timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/accounts/{}/ai/run/{}",
            self.base_url, self.account_id, self.model
        )
    }

    fn body<'a>(&self, request: &'a ModelRequest, stream: bool) -> RunRequest<'a> {
        RunRequest {
            messages: &request.messages,
            max_tokens: request.params.max_tokens,
            temperature: request.params.temperature,
            stream,
        }
    }
}

/// `response` from a streaming payload.
fn response_fragment(value: &Value) -> Option<String> {
    value
        .get("response")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[async_trait]
impl ModelClient for WorkersAiClient {
    async fn complete(&self, request: &ModelRequest) -> Result<String, ModelError> {
        debug!(model = %self.model, messages = request.messages.len(), "Workers AI run request");
        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&self.body(request, false))
            .send()
            .await?;
        let response = check_status(response).await?;
        let parsed: RunResponse = response.json().await?;
        match parsed.result {
            Some(result) => Ok(result.response.unwrap_or_default()),
            None => Err(ModelError::Decode(format!(
                "response had no result: {:?}",
                parsed.errors
            ))),
        }
    }

    async fn stream(&self, request: &ModelRequest) -> Result<ChunkStream, ModelError> {
        debug!(model = %self.model, messages = request.messages.len(), "Workers AI streaming run request");
        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&self.body(request, true))
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(spawn_sse_reader(response, response_fragment))
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
