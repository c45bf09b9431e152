use thiserror::Error;

/// Top-level error type for Taskpilot.
///
/// Subsystem crates define their own error types and convert into or out of
/// this one at crate boundaries so that `?` works across them.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TaskpilotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for TaskpilotError {
    fn from(err: toml::de::Error) -> Self {
        TaskpilotError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for TaskpilotError {
    fn from(err: toml::ser::Error) -> Self {
        TaskpilotError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for TaskpilotError {
    fn from(err: serde_json::Error) -> Self {
        TaskpilotError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Taskpilot operations.
pub type Result<T> = std::result::Result<T, TaskpilotError>;
