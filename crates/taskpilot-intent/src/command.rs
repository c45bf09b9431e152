//! Task command extraction.
//!
//! [`classify`] turns a raw chat message into a [`TaskCommand`] without
//! touching any state; [`apply`] performs the mutation on a task list.
//! Branches are mutually exclusive and checked in order: add, complete,
//! delete. Anything else is a plain conversational turn.

use chrono::{DateTime, TimeZone};
use regex::Regex;
use std::sync::LazyLock;
use taskpilot_core::types::{Priority, Task, Timestamp};
use tracing::debug;
use uuid::Uuid;

use crate::date::infer_due_date;

// =============================================================================
// Compiled patterns
// =============================================================================

static ADD_BODY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:add|create|new) task[:\s]+(.+)").expect("Invalid add-task regex")
});

/// Phrases removed from a task title: a preposition-anchored date
/// ("by friday", "on next monday"), a bare relative date ("tomorrow",
/// "next week", "next tuesday"), or "in N days". A bare weekday is left in
/// place so titles like "read the Sunday paper" survive.
static DATE_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:by|on|for|until)\s+(?:next\s+)?(?:today|tomorrow|next\s+week|monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b|\b(?:today|tomorrow|next\s+week|next\s+(?:monday|tuesday|wednesday|thursday|friday|saturday|sunday))\b|\bin\s+[0-9]+\s+days?\b",
    )
    .expect("Invalid date-phrase regex")
});

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+").expect("Invalid number regex"));

// =============================================================================
// Types
// =============================================================================

/// Fields for a task about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub due_date: Option<Timestamp>,
    pub priority: Priority,
}

/// A task-management intent detected in a message.
///
/// Positions are 1-based, matching the numbered listing shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskCommand {
    Add(NewTask),
    Complete { position: usize },
    Delete { position: usize },
    None,
}

/// What [`apply`] did to the task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Added(Uuid),
    Completed(usize),
    Deleted(usize),
    Ignored,
}

// =============================================================================
// Classification
// =============================================================================

/// Classify a message into a task command.
///
/// `now` is captured once by the caller and drives due date inference.
pub fn classify<Tz: TimeZone>(message: &str, now: &DateTime<Tz>) -> TaskCommand {
    let lower = message.to_lowercase();

    if lower.contains("add task") || lower.contains("create task") {
        return match ADD_BODY.captures(message) {
            Some(caps) => {
                let body = caps[1].trim();
                if body.is_empty() {
                    TaskCommand::None
                } else {
                    TaskCommand::Add(NewTask {
                        title: strip_date_phrases(body),
                        due_date: infer_due_date(body, now).map(|dt| Timestamp::from_datetime(&dt)),
                        priority: infer_priority(body),
                    })
                }
            }
            None => TaskCommand::None,
        };
    }

    if lower.contains("complete") || lower.contains("done") {
        return match first_number(message) {
            Some(position) => TaskCommand::Complete { position },
            None => TaskCommand::None,
        };
    }

    if lower.contains("delete task") || lower.contains("remove task") {
        return match first_number(message) {
            Some(position) => TaskCommand::Delete { position },
            None => TaskCommand::None,
        };
    }

    TaskCommand::None
}

/// Infer priority from keywords. Case-insensitive.
pub fn infer_priority(text: &str) -> Priority {
    let lower = text.to_lowercase();
    if ["urgent", "asap", "critical"]
        .iter()
        .any(|kw| lower.contains(kw))
    {
        Priority::High
    } else if lower.contains("important") {
        Priority::Medium
    } else {
        Priority::Normal
    }
}

/// Remove due date phrases from a task body to produce its title.
///
/// Each removed phrase takes the whitespace run in front of it along;
/// all other spacing is kept. Falls back to the trimmed body when nothing
/// is left.
pub fn strip_date_phrases(body: &str) -> String {
    let mut title = String::with_capacity(body.len());
    let mut last = 0;
    for m in DATE_PHRASE.find_iter(body) {
        title.push_str(body[last..m.start()].trim_end());
        last = m.end();
    }
    title.push_str(&body[last..]);

    match title.trim() {
        "" => body.trim().to_string(),
        trimmed => trimmed.to_string(),
    }
}

fn first_number(message: &str) -> Option<usize> {
    NUMBER
        .find(message)
        .and_then(|m| m.as_str().parse::<usize>().ok())
}

// =============================================================================
// Mutation
// =============================================================================

/// Apply a command to a task list.
///
/// Out-of-range positions (including 0) are silently ignored.
pub fn apply(command: TaskCommand, tasks: &mut Vec<Task>, now: Timestamp) -> CommandOutcome {
    match command {
        TaskCommand::Add(new) => {
            let task = Task::new(new.title, new.due_date, new.priority, now);
            let id = task.id;
            debug!(task_id = %id, title = %task.title, priority = %task.priority, "Task added");
            tasks.push(task);
            CommandOutcome::Added(id)
        }
        TaskCommand::Complete { position } => match index_of(position, tasks.len()) {
            Some(idx) => {
                tasks[idx].complete();
                debug!(position, "Task completed");
                CommandOutcome::Completed(position)
            }
            None => CommandOutcome::Ignored,
        },
        TaskCommand::Delete { position } => match index_of(position, tasks.len()) {
            Some(idx) => {
                let removed = tasks.remove(idx);
                debug!(position, task_id = %removed.id, "Task deleted");
                CommandOutcome::Deleted(position)
            }
            None => CommandOutcome::Ignored,
        },
        TaskCommand::None => CommandOutcome::Ignored,
    }
}

/// Classify `message` and apply the result to `tasks` in one step.
pub fn extract<Tz: TimeZone>(
    message: &str,
    tasks: &mut Vec<Task>,
    now: &DateTime<Tz>,
) -> CommandOutcome {
    let command = classify(message, now);
    apply(command, tasks, Timestamp::from_datetime(now))
}

fn index_of(position: usize, len: usize) -> Option<usize> {
    (1..=len).contains(&position).then(|| position - 1)
}

// =============================================================================
// Tests
// =============================================================================
