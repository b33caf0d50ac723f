//! Error types for the task list
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types a task list operation can produce
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TodoError {
    /// Task text is empty or too long after trimming
    #[error("Validation failed: {0}")]
    Validation(ValidationError),

    /// No task carries the requested id
    #[error("Task not found: {0}")]
    NotFound(String),

    /// The persistent slot could not be read or written
    #[error("IO error: {0}")]
    Io(String),

    /// An import payload was rejected
    #[error("Format error: {0}")]
    Format(String),
}

impl From<std::io::Error> for TodoError {
    fn from(e: std::io::Error) -> Self {
        TodoError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for TodoError {
    fn from(e: serde_json::Error) -> Self {
        TodoError::Io(e.to_string())
    }
}

impl From<rusqlite::Error> for TodoError {
    fn from(e: rusqlite::Error) -> Self {
        TodoError::Io(e.to_string())
    }
}

/// Why a task text was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("task text cannot be empty")]
    Empty,

    #[error("task text too long: {len} chars (max {max})")]
    TooLong { len: usize, max: usize },
}

/// Result type alias for task list operations
pub type Result<T> = std::result::Result<T, TodoError>;
