//! Intent extraction for Taskpilot.
//!
//! Detects task-management commands in chat messages and infers due dates
//! and priorities from free text. Everything here is pure and synchronous.

pub mod command;
pub mod date;

pub use command::{apply, classify, extract, infer_priority, CommandOutcome, NewTask, TaskCommand};
pub use date::infer_due_date;
