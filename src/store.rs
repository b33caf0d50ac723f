// Durable key-value slot holding the serialized task collection

use crate::codec::{self, Decoded};
use crate::error::{Result, TodoError};
use crate::models::{Task, now_ms};
use chrono::Utc;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info, warn};

const CURRENT_VERSION: u32 = 1;

/// Default slot key for the task collection
pub const DEFAULT_SLOT_KEY: &str = "todoApp_tasks";

/// String-keyed persistence of string values
pub trait SlotBackend {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

// ============================================================================
// SQLite backend
// ============================================================================

/// Slot backend stored in a SQLite database on disk
pub struct SqliteBackend {
    base_path: PathBuf,
    db: Connection,
}

impl SqliteBackend {
    /// Open or create a backend at the given path
    ///
    /// The database lives in a `.tasklist` subdirectory of the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().join(".tasklist");

        fs::create_dir_all(&base_path)
            .map_err(|e| TodoError::Io(format!("Failed to create store directory: {}", e)))?;

        let db_path = base_path.join("tasklist.db");
        let db = Connection::open(&db_path)
            .map_err(|e| TodoError::Io(format!("Failed to open SQLite database: {}", e)))?;

        let backend = Self { base_path, db };
        backend.create_schema()?;
        backend.create_gitignore()?;
        backend.write_version()?;

        info!(path = ?backend.base_path, "Opened slot store");
        Ok(backend)
    }

    fn create_schema(&self) -> Result<()> {
        debug!("Creating database schema");

        self.db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS slots (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;

        Ok(())
    }

    fn create_gitignore(&self) -> Result<()> {
        let gitignore_path = self.base_path.join(".gitignore");
        if !gitignore_path.exists() {
            fs::write(gitignore_path, "tasklist.db\ntasklist.db-shm\ntasklist.db-wal\n")?;
        }
        Ok(())
    }

    fn write_version(&self) -> Result<()> {
        let version_path = self.base_path.join(".version");
        if !version_path.exists() {
            fs::write(version_path, CURRENT_VERSION.to_string())?;
        }
        Ok(())
    }
}

impl SlotBackend for SqliteBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .db
            .query_row("SELECT value FROM slots WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.db.execute(
            "INSERT OR REPLACE INTO slots (key, value, updated_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![key, value, now_ms()],
        )?;
        Ok(())
    }
}

// ============================================================================
// In-memory backend
// ============================================================================

#[derive(Debug, Default)]
struct MemorySlots {
    values: HashMap<String, String>,
    quota_bytes: Option<usize>,
}

/// Process-local slot backend with an optional size quota
///
/// Clones share the same slots, so a clone can stand in for reopening the store.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Rc<RefCell<MemorySlots>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes whose total stored size would exceed `bytes`
    pub fn with_quota(bytes: usize) -> Self {
        let backend = Self::default();
        backend.inner.borrow_mut().quota_bytes = Some(bytes);
        backend
    }

    pub fn set_quota(&self, bytes: Option<usize>) {
        self.inner.borrow_mut().quota_bytes = bytes;
    }
}

impl SlotBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.inner.borrow().values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut slots = self.inner.borrow_mut();

        if let Some(quota) = slots.quota_bytes {
            let others: usize = slots
                .values
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > quota {
                return Err(TodoError::Io(format!(
                    "quota exceeded: {} bytes needed, {} allowed",
                    needed, quota
                )));
            }
        }

        slots.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ============================================================================
// Task store
// ============================================================================

/// Serialized shadow of the task collection in a single slot
pub struct TaskStore {
    backend: Box<dyn SlotBackend>,
    key: String,
}

impl TaskStore {
    pub fn new(backend: Box<dyn SlotBackend>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    /// Open a SQLite-backed store under `path`
    pub fn open<P: AsRef<Path>>(path: P, key: impl Into<String>) -> Result<Self> {
        let backend = SqliteBackend::open(path)?;
        Ok(Self::new(Box::new(backend), key))
    }

    /// Store backed by a fresh in-memory backend
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryBackend::new()), DEFAULT_SLOT_KEY)
    }

    /// Write the full collection to the slot
    pub fn save(&mut self, tasks: &[Task]) -> Result<()> {
        let json = codec::encode(tasks)?;
        self.backend.set(&self.key, &json).inspect_err(|e| {
            warn!(key = %self.key, error = %e, "Failed to save tasks");
        })?;
        debug!(key = %self.key, count = tasks.len(), "Saved tasks");
        Ok(())
    }

    /// Read the collection from the slot
    ///
    /// An absent slot is an empty collection. Malformed records are repaired;
    /// an unparseable slot is an `Io` error and callers fall back to empty.
    pub fn load(&self) -> Result<Vec<Task>> {
        let Some(json) = self.backend.get(&self.key)? else {
            debug!(key = %self.key, "Slot is empty");
            return Ok(Vec::new());
        };

        match codec::decode(&json, Utc::now()) {
            Ok(Decoded::Tasks(tasks, _)) => {
                info!(key = %self.key, count = tasks.len(), "Loaded tasks");
                Ok(tasks)
            }
            Ok(Decoded::NotAnArray(kind)) => {
                warn!(key = %self.key, kind, "Slot does not hold an array");
                Err(TodoError::Io(format!("stored tasks are a {}, expected an array", kind)))
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to parse stored tasks");
                Err(TodoError::Io(format!("stored tasks are unreadable: {}", e)))
            }
        }
    }
}
