//! Conversational task management for Taskpilot.
//!
//! Runs chat turns: applies task commands found in user messages, renders
//! the task list as model context, calls the model, and persists the
//! session. Batch and streaming variants share every step up to the model
//! call.

pub mod context;
pub mod error;
pub mod locks;
pub mod orchestrator;
pub mod types;

pub use context::{render_context, TaskAnalytics};
pub use error::ChatError;
pub use locks::SessionLocks;
pub use orchestrator::{Clock, TurnPipeline, APOLOGY_REPLY, FALLBACK_REPLY};
pub use types::{ChatReply, StreamEvent};
