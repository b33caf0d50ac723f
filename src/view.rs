//! Pure projection from the task collection to what gets displayed.
//!
//! Nothing here mutates state: callers pass the tasks, the active filter and
//! the current time, and get back a `RenderModel`.

use crate::filter::Filter;
use crate::models::{Task, TaskStats};
use chrono::{DateTime, Utc};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const MONTH: i64 = 30 * DAY;

/// Placeholder shown when the filtered view is empty
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyState {
    pub icon: &'static str,
    pub title: &'static str,
    pub message: &'static str,
}

impl EmptyState {
    pub fn for_filter(filter: Filter) -> Self {
        match filter {
            Filter::All => Self {
                icon: "clipboard-list",
                title: "No tasks yet",
                message: "Add your first task to get started!",
            },
            Filter::Active => Self {
                icon: "smile",
                title: "No active tasks",
                message: "Great job! You've completed all your tasks.",
            },
            Filter::Completed => Self {
                icon: "history",
                title: "No completed tasks",
                message: "Complete some tasks to see them here.",
            },
        }
    }
}

/// One displayable task row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskView {
    pub id: String,
    /// Raw task text, for plain-text surfaces
    pub text: String,
    /// Task text, escaped so it is never interpreted as markup
    pub text_html: String,
    pub completed: bool,
    /// e.g. "Created 5 minutes ago"
    pub created_label: String,
    /// e.g. "Completed just now"; only set for completed tasks
    pub completed_label: Option<String>,
}

/// Everything needed to draw the list, the counters and the clear action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderModel {
    pub filter: Filter,
    pub tasks: Vec<TaskView>,
    pub empty_state: Option<EmptyState>,
    pub stats: TaskStats,
    pub can_clear_completed: bool,
}

pub fn project(tasks: &[Task], filter: Filter, now: DateTime<Utc>) -> RenderModel {
    let rows: Vec<TaskView> = tasks
        .iter()
        .filter(|t| filter.matches(t))
        .map(|t| task_view(t, now))
        .collect();

    let empty_state = rows.is_empty().then(|| EmptyState::for_filter(filter));
    let stats = TaskStats::from_tasks(tasks);

    RenderModel {
        filter,
        tasks: rows,
        empty_state,
        stats,
        can_clear_completed: stats.completed > 0,
    }
}

fn task_view(task: &Task, now: DateTime<Utc>) -> TaskView {
    TaskView {
        id: task.id.clone(),
        text: task.text.clone(),
        text_html: escape_text(&task.text),
        completed: task.completed,
        created_label: format!("Created {}", time_ago(task.created_at, now)),
        completed_label: task
            .completed_at
            .map(|at| format!("Completed {}", time_ago(at, now))),
    }
}

/// Human-relative age of `then` as seen from `now`
///
/// Bands: under a minute, minutes, hours, days (under 30), then an absolute
/// `M/D/YYYY` date.
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds();

    if seconds < MINUTE {
        "just now".to_string()
    } else if seconds < HOUR {
        plural(seconds / MINUTE, "minute")
    } else if seconds < DAY {
        plural(seconds / HOUR, "hour")
    } else if seconds < MONTH {
        plural(seconds / DAY, "day")
    } else {
        then.format("%-m/%-d/%Y").to_string()
    }
}

fn plural(n: i64, unit: &str) -> String {
    let suffix = if n > 1 { "s" } else { "" };
    format!("{} {}{} ago", n, unit, suffix)
}

/// Escape text for display inside markup
pub fn escape_text(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}
