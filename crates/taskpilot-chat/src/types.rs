//! Values returned by the turn pipeline.

use serde::Serialize;
use taskpilot_core::types::{Role, Task};

/// Result of a batch turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatReply {
    pub role: Role,
    pub content: String,
    pub tasks: Vec<Task>,
}

/// One event of a streamed turn.
///
/// A stream carries `Tasks` once, then zero or more `Token`s, then exactly
/// one of `Done` or `Error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    Tasks { tasks: Vec<Task> },
    Token { content: String },
    Done,
    Error { message: String },
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done | StreamEvent::Error { .. })
    }
}
