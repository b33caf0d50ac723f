// Authoritative in-memory task collection

use crate::error::{Result, TodoError};
use crate::filter::Filter;
use crate::models::{Task, TaskStats, validate_text};
use crate::store::TaskStore;
use chrono::Utc;
use tracing::{debug, info};

/// Result of a mutation whose in-memory effect always applies
///
/// `io_error` is set when writing the collection to the store failed; the
/// change is live but may not survive a restart.
#[derive(Debug, Clone, PartialEq)]
pub struct Persisted<T> {
    pub value: T,
    pub io_error: Option<TodoError>,
}

impl<T> Persisted<T> {
    pub fn is_durable(&self) -> bool {
        self.io_error.is_none()
    }
}

/// Ordered task collection (newest first) backed by a `TaskStore`
pub struct TaskRepository {
    tasks: Vec<Task>,
    store: TaskStore,
}

impl TaskRepository {
    /// Load the collection from the store
    ///
    /// An unreadable store yields an empty repository plus the load error.
    pub fn open(store: TaskStore) -> (Self, Option<TodoError>) {
        let (tasks, error) = match store.load() {
            Ok(tasks) => (tasks, None),
            Err(e) => (Vec::new(), Some(e)),
        };
        (Self { tasks, store }, error)
    }

    /// All tasks in display order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Add a new task at the front of the collection
    pub fn create(&mut self, text: &str) -> Result<Persisted<Task>> {
        let text = validate_text(text)?;
        let task = Task::new(text, Utc::now());
        debug!(id = %task.id, "Task created");

        self.tasks.insert(0, task.clone());
        Ok(self.persisted(task))
    }

    /// Flip a task's completion state
    pub fn toggle_completion(&mut self, id: &str) -> Result<Persisted<Task>> {
        let task = self.find_mut(id)?;
        task.toggle(Utc::now());
        let task = task.clone();
        debug!(id = %task.id, completed = task.completed, "Task toggled");

        Ok(self.persisted(task))
    }

    /// Replace a task's text; every other field is left alone
    pub fn edit(&mut self, id: &str, new_text: &str) -> Result<Persisted<Task>> {
        let text = validate_text(new_text)?;
        let task = self.find_mut(id)?;
        task.text = text;
        let task = task.clone();
        debug!(id = %task.id, "Task edited");

        Ok(self.persisted(task))
    }

    /// Remove a task unconditionally, returning it
    pub fn delete(&mut self, id: &str) -> Result<Persisted<Task>> {
        let index = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| TodoError::NotFound(id.to_string()))?;
        let task = self.tasks.remove(index);
        debug!(id = %task.id, "Task deleted");

        Ok(self.persisted(task))
    }

    /// Remove every completed task, returning how many went
    ///
    /// Nothing is written when no task was completed.
    pub fn clear_completed(&mut self) -> Persisted<usize> {
        let before = self.tasks.len();
        self.tasks.retain(|t| !t.completed);
        let removed = before - self.tasks.len();

        if removed == 0 {
            return Persisted {
                value: 0,
                io_error: None,
            };
        }

        info!(removed, "Cleared completed tasks");
        self.persisted(removed)
    }

    /// Swap in an entirely new collection (used by import)
    pub fn replace_all(&mut self, tasks: Vec<Task>) -> Persisted<usize> {
        let count = tasks.len();
        self.tasks = tasks;
        info!(count, "Replaced task collection");
        self.persisted(count)
    }

    /// Tasks selected by `filter`, in collection order
    pub fn filtered_view(&self, filter: Filter) -> Vec<&Task> {
        self.tasks.iter().filter(|t| filter.matches(t)).collect()
    }

    pub fn stats(&self) -> TaskStats {
        TaskStats::from_tasks(&self.tasks)
    }

    fn find_mut(&mut self, id: &str) -> Result<&mut Task> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| TodoError::NotFound(id.to_string()))
    }

    fn persisted<T>(&mut self, value: T) -> Persisted<T> {
        let io_error = self.store.save(&self.tasks).err();
        Persisted { value, io_error }
    }
}
