// Tasklist - Local task list with durable storage, filtering and JSON backups

pub mod app;
pub mod codec;
pub mod config;
pub mod error;
pub mod filter;
pub mod models;
pub mod notifier;
pub mod record;
pub mod repository;
pub mod store;
pub mod transfer;
pub mod view;

// Re-export main types for convenience
pub use app::{Confirm, TodoApp};
pub use config::Config;
pub use error::{Result, TodoError, ValidationError};
pub use filter::Filter;
pub use models::{MAX_TEXT_LEN, Task, TaskStats, now_ms};
pub use notifier::{Notification, Notifier, Severity};
pub use repository::{Persisted, TaskRepository};
pub use store::{MemoryBackend, SlotBackend, SqliteBackend, TaskStore};
pub use transfer::{ExportFile, ImportFile};
pub use view::{RenderModel, project};
