// Lenient repair of persisted task records

use crate::models::{Task, new_id};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::warn;

/// Summary of what a repair pass had to change
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// Records that needed at least one field patched
    pub repaired: usize,
    /// Entries dropped because they were not JSON objects
    pub skipped: usize,
    /// Records whose id collided with an earlier record and was reassigned
    pub reassigned_ids: usize,
}

impl RepairReport {
    pub fn is_clean(&self) -> bool {
        self.repaired == 0 && self.skipped == 0 && self.reassigned_ids == 0
    }
}

/// Turn raw array entries into tasks, patching missing or mistyped fields
///
/// Objects always yield a task; anything else is skipped. Ids stay unique across
/// the result: later duplicates get a fresh id.
pub fn repair_records(values: &[Value], now: DateTime<Utc>) -> (Vec<Task>, RepairReport) {
    let mut report = RepairReport::default();
    let mut seen: HashSet<String> = HashSet::with_capacity(values.len());
    let mut tasks = Vec::with_capacity(values.len());

    for (index, value) in values.iter().enumerate() {
        let Some(object) = value.as_object() else {
            warn!(index, kind = value_kind(value), "Skipping non-object task record");
            report.skipped += 1;
            continue;
        };

        let (mut task, patched) = repair_record(object, now);
        if !patched.is_empty() {
            warn!(index, id = %task.id, fields = ?patched, "Repaired task record");
            report.repaired += 1;
        }

        if !seen.insert(task.id.clone()) {
            let fresh = new_id();
            warn!(index, old_id = %task.id, new_id = %fresh, "Reassigned duplicate task id");
            task.id = fresh;
            seen.insert(task.id.clone());
            report.reassigned_ids += 1;
        }

        tasks.push(task);
    }

    (tasks, report)
}

/// Repair a single record, returning the task and the names of patched fields
fn repair_record(object: &Map<String, Value>, now: DateTime<Utc>) -> (Task, Vec<&'static str>) {
    let mut patched = Vec::new();

    let id = match object.get("id") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => {
            patched.push("id");
            new_id()
        }
    };

    let text = match object.get("text") {
        Some(Value::String(s)) => s.clone(),
        _ => {
            patched.push("text");
            String::new()
        }
    };

    let completed = match object.get("completed") {
        Some(Value::Bool(b)) => *b,
        _ => {
            patched.push("completed");
            false
        }
    };

    let created_at = match object.get("createdAt").and_then(parse_timestamp) {
        Some(ts) => ts,
        None => {
            patched.push("createdAt");
            now
        }
    };

    let parsed_completed_at = object.get("completedAt").and_then(parse_timestamp);
    let completed_at = match (completed, parsed_completed_at) {
        (true, Some(ts)) => Some(ts),
        (true, None) => {
            patched.push("completedAt");
            Some(now)
        }
        (false, Some(_)) => {
            patched.push("completedAt");
            None
        }
        (false, None) => None,
    };

    let task = Task {
        id,
        text,
        completed,
        created_at,
        completed_at,
    };
    (task, patched)
}

/// Accept RFC 3339 strings or epoch milliseconds
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s).ok().map(|ts| ts.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_complete_record_is_untouched() {
        let now = Utc::now();
        let values = vec![json!({
            "id": "t1",
            "text": "Buy milk",
            "completed": true,
            "createdAt": "2024-01-01T10:00:00Z",
            "completedAt": "2024-01-02T10:00:00Z",
        })];

        let (tasks, report) = repair_records(&values, now);
        assert!(report.is_clean());
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, "t1");
        assert_eq!(tasks[0].text, "Buy milk");
        assert!(tasks[0].completed);
        assert_eq!(tasks[0].created_at.to_rfc3339(), "2024-01-01T10:00:00+00:00");
        assert!(tasks[0].completed_at.is_some());
    }

    #[test]
    fn test_missing_fields_get_defaults() {
        let now = Utc::now();
        let values = vec![json!({})];

        let (tasks, report) = repair_records(&values, now);
        assert_eq!(report.repaired, 1);
        let task = &tasks[0];
        assert!(!task.id.is_empty());
        assert_eq!(task.text, "");
        assert!(!task.completed);
        assert_eq!(task.created_at, now);
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn test_numeric_id_becomes_string() {
        let values = vec![json!({"id": 1700000000000_i64, "text": "x"})];
        let (tasks, _) = repair_records(&values, Utc::now());
        assert_eq!(tasks[0].id, "1700000000000");
    }

    #[test]
    fn test_epoch_millis_timestamp_accepted() {
        let values = vec![json!({"id": "a", "text": "x", "completed": false, "createdAt": 1_000_i64})];
        let (tasks, report) = repair_records(&values, Utc::now());
        assert!(report.is_clean());
        assert_eq!(tasks[0].created_at.timestamp_millis(), 1_000);
    }

    #[test]
    fn test_completed_at_follows_completed_flag() {
        let now = Utc::now();
        let values = vec![
            json!({"id": "a", "text": "x", "completed": true, "createdAt": "2024-01-01T00:00:00Z"}),
            json!({"id": "b", "text": "y", "completed": false, "createdAt": "2024-01-01T00:00:00Z",
                   "completedAt": "2024-01-03T00:00:00Z"}),
        ];

        let (tasks, report) = repair_records(&values, now);
        assert_eq!(report.repaired, 2);
        assert_eq!(tasks[0].completed_at, Some(now));
        assert!(tasks[1].completed_at.is_none());
    }

    #[test]
    fn test_mistyped_completed_defaults_to_false() {
        let values = vec![json!({"id": "a", "text": "x", "completed": "yes"})];
        let (tasks, _) = repair_records(&values, Utc::now());
        assert!(!tasks[0].completed);
    }

    #[test]
    fn test_non_objects_are_skipped() {
        let values = vec![json!(null), json!(5), json!({"id": "keep", "text": "x"})];
        let (tasks, report) = repair_records(&values, Utc::now());
        assert_eq!(report.skipped, 2);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, "keep");
    }

    #[test]
    fn test_duplicate_ids_are_reassigned() {
        let values = vec![
            json!({"id": "same", "text": "first"}),
            json!({"id": "same", "text": "second"}),
            json!({"text": "third"}),
            json!({"text": "fourth"}),
        ];

        let (tasks, report) = repair_records(&values, Utc::now());
        assert_eq!(report.reassigned_ids, 1);
        assert_eq!(tasks[0].id, "same");
        assert_ne!(tasks[1].id, "same");

        let ids: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids.len(), 4);
    }
}
