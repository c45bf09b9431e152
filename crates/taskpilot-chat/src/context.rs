//! System prompt rendering.
//!
//! Turns the current task list into the system-role message sent ahead of
//! the conversation window: a persona preamble, a one-line overview, and a
//! numbered listing annotated with due dates and priorities.

use std::fmt::{self, Write};

use chrono::{DateTime, TimeZone};
use serde::Serialize;
use taskpilot_core::types::{Priority, Task, TaskStatus, Timestamp};

pub const PERSONA_PREAMBLE: &str = "You are a helpful personal task assistant. You can help \
manage tasks, provide insights, and offer proactive suggestions. ";

pub const EMPTY_LIST_GUIDANCE: &str = "The user currently has no tasks. Encourage them to add \
tasks and explain the features available (due dates, priorities, natural language).";

const INSIGHT_HINT: &str = "\n\u{1f4a1} Provide helpful insights about task priorities, time \
management, or completion suggestions when appropriate.";

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Window after `now` in which a pending task counts as due soon.
const DUE_SOON_MS: i64 = 2 * DAY_MS;

// =============================================================================
// Analytics
// =============================================================================

/// Counts derived from a task list at a given instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAnalytics {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    /// Pending and high priority.
    pub high_priority: usize,
    /// Pending with a due date in `[now, now + 2 days]`.
    pub due_soon: usize,
    /// Pending with a due date before `now`.
    pub overdue: usize,
}

impl TaskAnalytics {
    pub fn from_tasks(tasks: &[Task], now: Timestamp) -> Self {
        let mut analytics = TaskAnalytics {
            total: tasks.len(),
            ..Default::default()
        };

        for task in tasks {
            match task.status {
                TaskStatus::Completed => {
                    analytics.completed += 1;
                    continue;
                }
                TaskStatus::Pending => analytics.pending += 1,
            }

            if task.priority == Priority::High {
                analytics.high_priority += 1;
            }

            if let Some(due) = task.due_date {
                let diff = due.0 - now.0;
                if diff < 0 {
                    analytics.overdue += 1;
                } else if diff <= DUE_SOON_MS {
                    analytics.due_soon += 1;
                }
            }
        }

        analytics
    }

    fn summary_line(&self) -> String {
        let mut line = format!(
            "\u{1f4ca} Task Overview: {} total ({} completed, {} pending)",
            self.total, self.completed, self.pending
        );
        if self.high_priority > 0 {
            let _ = write!(line, ", {} high priority", self.high_priority);
        }
        if self.due_soon > 0 {
            let _ = write!(line, ", {} due soon", self.due_soon);
        }
        if self.overdue > 0 {
            let _ = write!(line, ", \u{26a0}\u{fe0f} {} overdue", self.overdue);
        }
        line
    }
}

// =============================================================================
// Rendering
// =============================================================================

/// Render the system prompt for a task list.
///
/// Pure and deterministic for a given `now`. Dates are formatted `M/D/YYYY`
/// in the time zone of `now`.
pub fn render_context<Tz>(tasks: &[Task], now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let mut context = String::from(PERSONA_PREAMBLE);

    if tasks.is_empty() {
        context.push_str(EMPTY_LIST_GUIDANCE);
        return context;
    }

    let now_ts = Timestamp::from_datetime(now);
    let analytics = TaskAnalytics::from_tasks(tasks, now_ts);

    context.push_str("\n\n");
    context.push_str(&analytics.summary_line());
    context.push_str("\n\nCurrent tasks:\n");

    for (idx, task) in tasks.iter().enumerate() {
        let _ = write!(context, "{}. [{}] {}", idx + 1, task.status, task.title);
        if let Some(due) = task.due_date {
            context.push_str(&due_annotation(due, now));
        }
        if task.priority != Priority::Normal {
            let _ = write!(context, " [{} priority]", task.priority);
        }
        context.push('\n');
    }

    context.push_str(INSIGHT_HINT);
    context
}

/// Annotation for a due date, by whole days remaining (rounded up).
///
/// Anything strictly before `now` is overdue, even when less than a day.
fn due_annotation<Tz>(due: Timestamp, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let diff = due.0 - now.timestamp_millis();
    if diff < 0 {
        return format!(" (\u{26a0}\u{fe0f} OVERDUE: {})", format_date(due, now));
    }

    match (diff + DAY_MS - 1) / DAY_MS {
        0 => " (\u{1f525} due TODAY)".to_string(),
        1 => " (due tomorrow)".to_string(),
        _ => format!(" (due: {})", format_date(due, now)),
    }
}

fn format_date<Tz>(ts: Timestamp, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    match now.timezone().timestamp_millis_opt(ts.0).single() {
        Some(dt) => dt.format("%-m/%-d/%Y").to_string(),
        None => ts.0.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset, Utc};

    /// Friday 2026-10-16, mid-morning.
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap()
    }

    fn task(title: &str, due_in: Option<Duration>, priority: Priority) -> Task {
        let due = due_in.map(|d| Timestamp::from_datetime(&(now() + d)));
        Task::new(title, due, priority, Timestamp(0))
    }

    fn completed(mut task: Task) -> Task {
        task.complete();
        task
    }

    // ---- Analytics ----

    #[test]
    fn test_analytics_counts() {
        let tasks = vec![
            task("a", None, Priority::High),
            task("b", Some(Duration::hours(-1)), Priority::Normal),
            task("c", Some(Duration::hours(30)), Priority::Medium),
            completed(task("d", Some(Duration::hours(-5)), Priority::High)),
            task("e", Some(Duration::days(5)), Priority::Normal),
        ];
        let analytics = TaskAnalytics::from_tasks(&tasks, Timestamp::from_datetime(&now()));

        assert_eq!(
            analytics,
            TaskAnalytics {
                total: 5,
                completed: 1,
                pending: 4,
                high_priority: 1,
                due_soon: 1,
                overdue: 1,
            }
        );
    }

    #[test]
    fn test_due_soon_boundaries() {
        let tasks = vec![
            task("now", Some(Duration::zero()), Priority::Normal),
            task("edge", Some(Duration::days(2)), Priority::Normal),
            task("past edge", Some(Duration::days(2) + Duration::milliseconds(1)), Priority::Normal),
        ];
        let analytics = TaskAnalytics::from_tasks(&tasks, Timestamp::from_datetime(&now()));
        assert_eq!(analytics.due_soon, 2);
        assert_eq!(analytics.overdue, 0);
    }

    // ---- Empty list ----

    #[test]
    fn test_empty_list_context() {
        let context = render_context(&[], &now());
        assert!(context.starts_with(PERSONA_PREAMBLE));
        assert!(context.ends_with(EMPTY_LIST_GUIDANCE));
        assert!(!context.contains("OVERDUE"));
        assert!(!context.contains("1."));
        assert!(!context.contains("Current tasks"));
    }

    // ---- Listing ----

    #[test]
    fn test_full_context_layout() {
        let tasks = vec![
            task("buy milk", None, Priority::Normal),
            completed(task("file taxes", None, Priority::High)),
        ];
        let context = render_context(&tasks, &now());
        let expected = format!(
            "{}\n\n\u{1f4ca} Task Overview: 2 total (1 completed, 1 pending)\n\n\
             Current tasks:\n\
             1. [pending] buy milk\n\
             2. [completed] file taxes [high priority]\n{}",
            PERSONA_PREAMBLE, INSIGHT_HINT
        );
        assert_eq!(context, expected);
    }

    #[test]
    fn test_overdue_task_marked() {
        let tasks = vec![task("report", Some(Duration::days(-2)), Priority::Normal)];
        let context = render_context(&tasks, &now());
        assert!(context.contains(", \u{26a0}\u{fe0f} 1 overdue"));
        assert!(context.contains("1. [pending] report (\u{26a0}\u{fe0f} OVERDUE: 10/14/2026)"));
    }

    #[test]
    fn test_overdue_by_minutes_is_overdue_not_today() {
        let tasks = vec![task("standup", Some(Duration::minutes(-5)), Priority::Normal)];
        let context = render_context(&tasks, &now());
        assert!(context.contains("OVERDUE"));
        assert!(!context.contains("due TODAY"));
    }

    #[test]
    fn test_due_annotations() {
        let tasks = vec![
            task("now", Some(Duration::zero()), Priority::Normal),
            task("tonight", Some(Duration::hours(10)), Priority::Normal),
            task("tomorrow", Some(Duration::hours(30)), Priority::Normal),
            task("later", Some(Duration::days(4)), Priority::Normal),
        ];
        let context = render_context(&tasks, &now());
        assert!(context.contains("1. [pending] now (\u{1f525} due TODAY)\n"));
        assert!(context.contains("2. [pending] tonight (due tomorrow)\n"));
        assert!(context.contains("3. [pending] tomorrow (due: 10/17/2026)\n"));
        assert!(context.contains("4. [pending] later (due: 10/20/2026)\n"));
    }

    #[test]
    fn test_summary_omits_zero_counts() {
        let tasks = vec![task("a", None, Priority::Medium)];
        let context = render_context(&tasks, &now());
        assert!(context.contains("Task Overview: 1 total (0 completed, 1 pending)\n"));
        assert!(!context.contains("high priority,"));
        assert!(!context.contains("due soon"));
        assert!(!context.contains("overdue"));
        assert!(context.contains("1. [pending] a [medium priority]"));
    }

    #[test]
    fn test_summary_includes_nonzero_counts_in_order() {
        let tasks = vec![
            task("a", Some(Duration::hours(5)), Priority::High),
            task("b", Some(Duration::hours(-5)), Priority::Normal),
        ];
        let context = render_context(&tasks, &now());
        assert!(context.contains(
            "2 total (0 completed, 2 pending), 1 high priority, 1 due soon, \u{26a0}\u{fe0f} 1 overdue"
        ));
    }

    #[test]
    fn test_dates_use_zone_of_now() {
        // 2026-10-20 02:00 UTC is still the 19th at UTC-5.
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let local_now = now().with_timezone(&tz);
        let due = Utc.with_ymd_and_hms(2026, 10, 20, 2, 0, 0).unwrap();
        let tasks = vec![Task::new(
            "x",
            Some(Timestamp::from_datetime(&due)),
            Priority::Normal,
            Timestamp(0),
        )];
        let context = render_context(&tasks, &local_now);
        assert!(context.contains("(due: 10/19/2026)"));
    }

    #[test]
    fn test_deterministic() {
        let tasks = vec![task("a", Some(Duration::days(3)), Priority::High)];
        assert_eq!(render_context(&tasks, &now()), render_context(&tasks, &now()));
    }
}
