//! Language model collaborators for Taskpilot.
//!
//! The turn pipeline only sees [`ModelClient`]. Backends: an
//! OpenAI-compatible HTTP client, a Cloudflare Workers AI client, and a
//! scripted model for offline use and tests.

pub mod error;
mod http;
pub mod mock;
pub mod openai;
pub mod sse;
pub mod types;
pub mod workers_ai;

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use taskpilot_core::config::{ModelConfig, ModelProvider};
use tokio_stream::Stream;
use tracing::{info, warn};

pub use error::ModelError;
pub use mock::ScriptedModel;
pub use openai::OpenAiClient;
pub use types::{GenerationParams, MessageRole, ModelChunk, ModelMessage, ModelRequest};
pub use workers_ai::WorkersAiClient;

/// Lazy, finite, one-shot sequence of reply fragments.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ModelChunk, ModelError>> + Send>>;

/// A language model that can answer a message list in one piece or as a
/// stream of fragments.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Return the full reply text.
    async fn complete(&self, request: &ModelRequest) -> Result<String, ModelError>;

    /// Start a streamed reply. Errors before the first fragment are
    /// returned here; later ones arrive as stream items.
    async fn stream(&self, request: &ModelRequest) -> Result<ChunkStream, ModelError>;

    /// Model identifier, for logs.
    fn model_id(&self) -> &str;
}

/// Build the configured backend.
///
/// The API key is read from the environment variable named by
/// `config.api_key_env`. Workers AI requires both a key and an account id;
/// OpenAI-compatible servers may run without a key.
pub fn build_client(config: &ModelConfig) -> Result<Arc<dyn ModelClient>, ModelError> {
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let api_key = std::env::var(&config.api_key_env)
        .ok()
        .filter(|k| !k.trim().is_empty());

    let client: Arc<dyn ModelClient> = match config.provider {
        ModelProvider::Offline => {
            info!("No model provider configured, using offline replies");
            Arc::new(ScriptedModel::offline())
        }
        ModelProvider::Openai => {
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| openai::DEFAULT_BASE_URL.to_string());
            if api_key.is_none() {
                warn!(
                    env = %config.api_key_env,
                    "No API key set for OpenAI-compatible backend, sending unauthenticated requests"
                );
            }
            info!(base_url = %base_url, model = %config.model, "Using OpenAI-compatible backend");
            Arc::new(OpenAiClient::new(
                base_url,
                api_key,
                config.model.clone(),
                timeout,
            )?)
        }
        ModelProvider::WorkersAi => {
            let account_id = config.account_id.clone().ok_or_else(|| {
                ModelError::Config("model.account_id is required for workers-ai".to_string())
            })?;
            let api_key = api_key.ok_or_else(|| {
                ModelError::Config(format!(
                    "environment variable {} must hold a Workers AI API token",
                    config.api_key_env
                ))
            })?;
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| workers_ai::DEFAULT_BASE_URL.to_string());
            info!(model = %config.model, "Using Workers AI backend");
            Arc::new(WorkersAiClient::new(
                base_url,
                account_id,
                api_key,
                config.model.clone(),
                timeout,
            )?)
        }
    };

    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: ModelProvider) -> ModelConfig {
        ModelConfig {
            provider,
            api_key_env: "TASKPILOT_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..ModelConfig::default()
        }
    }

    #[test]
    fn test_build_offline() {
        let client = build_client(&config(ModelProvider::Offline)).unwrap();
        assert_eq!(client.model_id(), "scripted");
    }

    #[test]
    fn test_build_openai_without_key() {
        let mut cfg = config(ModelProvider::Openai);
        cfg.model = "llama3".to_string();
        cfg.base_url = Some("http://127.0.0.1:11434".to_string());
        let client = build_client(&cfg).unwrap();
        assert_eq!(client.model_id(), "llama3");
    }

    #[test]
    fn test_build_workers_ai_requires_account() {
        let result = build_client(&config(ModelProvider::WorkersAi));
        assert!(matches!(result, Err(ModelError::Config(msg)) if msg.contains("account_id")));
    }

    #[test]
    fn test_build_workers_ai_requires_key() {
        let mut cfg = config(ModelProvider::WorkersAi);
        cfg.account_id = Some("acct".to_string());
        let result = build_client(&cfg);
        assert!(matches!(result, Err(ModelError::Config(msg)) if msg.contains("TASKPILOT_TEST_KEY")));
    }
}
