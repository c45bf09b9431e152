use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// Lifecycle state of a task. The only transition is `Pending -> Completed`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Task priority, inferred once from keywords when the task is created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    #[default]
    Normal,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Normal => write!(f, "normal"),
        }
    }
}

/// Author of a conversation turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Newtype Wrappers - Temporal
// =============================================================================

/// Unix timestamp in milliseconds since epoch.
///
/// Serialized as a bare number. Compared by value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    pub fn from_datetime<Tz: chrono::TimeZone>(dt: &DateTime<Tz>) -> Self {
        Self(dt.timestamp_millis())
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.0).unwrap_or_default()
    }
}

// =============================================================================
// Domain Structs
// =============================================================================

/// A to-do item owned by one session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub status: TaskStatus,
    pub created_at: Timestamp,
    #[serde(default)]
    pub due_date: Option<Timestamp>,
    #[serde(default)]
    pub priority: Priority,
}

impl Task {
    /// Create a new pending task with a fresh id.
    pub fn new(
        title: impl Into<String>,
        due_date: Option<Timestamp>,
        priority: Priority,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            status: TaskStatus::Pending,
            created_at,
            due_date,
            priority,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == TaskStatus::Pending
    }

    /// Mark the task completed. Completing an already completed task is a no-op.
    pub fn complete(&mut self) {
        self.status = TaskStatus::Completed;
    }
}

/// One message in a session transcript.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: Timestamp,
}

impl ConversationTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Timestamp::now(),
        }
    }
}

/// Everything persisted for one session: the task list and the transcript.
///
/// Stored as a single opaque blob keyed by session id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub conversations: Vec<ConversationTurn>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn to the transcript.
    pub fn push_turn(&mut self, role: Role, content: impl Into<String>) {
        self.conversations.push(ConversationTurn::new(role, content));
    }

    /// The most recent `window` turns, oldest first.
    pub fn recent_turns(&self, window: usize) -> &[ConversationTurn] {
        let start = self.conversations.len().saturating_sub(window);
        &self.conversations[start..]
    }

    /// Drop the oldest turns so that at most `limit` remain.
    pub fn trim_transcript(&mut self, limit: usize) {
        let excess = self.conversations.len().saturating_sub(limit);
        if excess > 0 {
            self.conversations.drain(..excess);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
