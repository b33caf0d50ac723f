// Data models for the task list

use crate::error::{Result, TodoError, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum task text length, in characters, after trimming
pub const MAX_TEXT_LEN: usize = 100;

/// A single to-do item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub text: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Build a fresh, incomplete task. `text` must already be validated.
    pub fn new(text: String, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            text,
            completed: false,
            created_at: now,
            completed_at: None,
        }
    }

    /// Flip the completion flag, keeping `completed_at` in step with it
    pub fn toggle(&mut self, now: DateTime<Utc>) {
        self.completed = !self.completed;
        self.completed_at = if self.completed { Some(now) } else { None };
    }
}

/// Derived counters over a task collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
}

impl TaskStats {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let completed = tasks.iter().filter(|t| t.completed).count();
        Self {
            total: tasks.len(),
            active: tasks.len() - completed,
            completed,
        }
    }
}

/// Trim and check task text, returning the value to store
pub fn validate_text(raw: &str) -> Result<String> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(TodoError::Validation(ValidationError::Empty));
    }

    let len = text.chars().count();
    if len > MAX_TEXT_LEN {
        return Err(TodoError::Validation(ValidationError::TooLong {
            len,
            max: MAX_TEXT_LEN,
        }));
    }

    Ok(text.to_string())
}

/// Generate a collision-resistant, time-ordered task id
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}

/// Helper function to get current timestamp in milliseconds
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_now_ms() {
        let ts = now_ms();
        assert!(ts > 0);
        // Should be reasonable timestamp (after year 2020)
        assert!(ts > 1_600_000_000_000);
    }

    #[test]
    fn test_validate_text_trims() {
        assert_eq!(validate_text("  buy milk \n").unwrap(), "buy milk");
    }

    #[test]
    fn test_validate_text_rejects_blank() {
        for blank in ["", " ", "\t\n"] {
            assert_eq!(validate_text(blank), Err(TodoError::Validation(ValidationError::Empty)));
        }
    }

    #[test]
    fn test_validate_text_length_counts_chars_after_trim() {
        assert!(validate_text(&"a".repeat(100)).is_ok());
        assert!(validate_text(&format!("  {}  ", "a".repeat(100))).is_ok());
        assert_eq!(
            validate_text(&format!(" {} ", "a".repeat(101))),
            Err(TodoError::Validation(ValidationError::TooLong { len: 101, max: 100 }))
        );
        // Multi-byte characters count once each
        assert!(validate_text(&"é".repeat(100)).is_ok());
    }

    #[test]
    fn test_new_ids_are_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| new_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_toggle_keeps_completed_at_in_step() {
        let now = Utc::now();
        let mut task = Task::new("x".to_string(), now);
        assert!(!task.completed);
        assert!(task.completed_at.is_none());

        task.toggle(now);
        assert!(task.completed);
        assert_eq!(task.completed_at, Some(now));

        task.toggle(now);
        assert!(!task.completed);
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn test_task_serialization_uses_camel_case() {
        let task = Task::new("write tests".to_string(), Utc::now());
        let json = serde_json::to_value(&task).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("completedAt").unwrap().is_null());
        assert_eq!(json["completed"], false);

        let back: Task = serde_json::from_value(json).unwrap();
        assert_eq!(back, task);
    }

    #[test]
    fn test_stats_from_tasks() {
        let now = Utc::now();
        let mut done = Task::new("a".to_string(), now);
        done.toggle(now);
        let tasks = vec![done, Task::new("b".to_string(), now), Task::new("c".to_string(), now)];

        let stats = TaskStats::from_tasks(&tasks);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.active, 2);
        assert_eq!(stats.completed, 1);
    }
}
