use thiserror::Error;

/// Errors from a language model backend.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model configuration error: {0}")]
    Config(String),

    #[error("Model transport error: {0}")]
    Transport(String),

    #[error("Model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Model response decode error: {0}")]
    Decode(String),

    #[error("Model stream error: {0}")]
    Stream(String),
}

impl From<reqwest::Error> for ModelError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ModelError::Transport(format!("request timed out: {}", err))
        } else if err.is_decode() {
            ModelError::Decode(err.to_string())
        } else {
            ModelError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Decode(err.to_string())
    }
}
