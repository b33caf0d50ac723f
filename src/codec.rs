// JSON encoding of the task collection

use crate::error::Result;
use crate::models::Task;
use crate::record::{self, RepairReport};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info};

/// Encode the collection compactly for the persistent slot
pub fn encode(tasks: &[Task]) -> Result<String> {
    let json = serde_json::to_string(tasks)?;
    debug!(count = tasks.len(), bytes = json.len(), "Encoded task collection");
    Ok(json)
}

/// Encode the collection with two-space indentation for backup files
pub fn encode_pretty(tasks: &[Task]) -> Result<String> {
    Ok(serde_json::to_string_pretty(tasks)?)
}

/// Outcome of decoding a serialized collection
#[derive(Debug)]
pub enum Decoded {
    /// Top level was an array; entries were repaired as needed
    Tasks(Vec<Task>, RepairReport),
    /// Valid JSON, but the top level is not an array
    NotAnArray(&'static str),
}

/// Parse a serialized collection, repairing individual records
///
/// Returns an error only when the text is not JSON at all.
pub fn decode(json: &str, now: DateTime<Utc>) -> Result<Decoded> {
    let value: Value = serde_json::from_str(json)?;

    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(_) => return Ok(Decoded::NotAnArray("object")),
        Value::String(_) => return Ok(Decoded::NotAnArray("string")),
        Value::Number(_) => return Ok(Decoded::NotAnArray("number")),
        Value::Bool(_) => return Ok(Decoded::NotAnArray("bool")),
        Value::Null => return Ok(Decoded::NotAnArray("null")),
    };

    let (tasks, report) = record::repair_records(&entries, now);
    if !report.is_clean() {
        info!(
            repaired = report.repaired,
            skipped = report.skipped,
            reassigned_ids = report.reassigned_ids,
            "Decoded task collection with repairs"
        );
    }

    Ok(Decoded::Tasks(tasks, report))
}
