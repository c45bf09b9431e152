//! Error types for the turn pipeline.

use taskpilot_core::error::TaskpilotError;

/// Errors that end a turn before a reply is produced.
///
/// Model failures are not here: they degrade to a fixed reply in batch mode
/// and to a terminal stream event in streaming mode.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("session id cannot be empty")]
    MissingSession,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("storage error: {0}")]
    Storage(String),
}

impl ChatError {
    /// Whether the caller sent something invalid, as opposed to an
    /// infrastructure failure.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ChatError::Storage(_))
    }
}

impl From<TaskpilotError> for ChatError {
    fn from(err: TaskpilotError) -> Self {
        ChatError::Storage(err.to_string())
    }
}
