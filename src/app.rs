//! Command handlers for user actions.
//!
//! Each handler takes structured input, runs it through the repository and
//! posts the resulting user-facing notification. Errors are returned to the
//! caller as well, but they have already been surfaced by the time it sees
//! them.

use crate::config::NotificationConfig;
use crate::error::{Result, TodoError, ValidationError};
use crate::filter::Filter;
use crate::models::{Task, now_ms};
use crate::notifier::{Notifier, Severity};
use crate::repository::{Persisted, TaskRepository};
use crate::store::TaskStore;
use crate::transfer::{self, ImportFile};
use crate::view::{self, RenderModel};
use chrono::{DateTime, NaiveDate, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Asks the user to approve a destructive action
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F: FnMut(&str) -> bool> Confirm for F {
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

pub struct TodoApp {
    repo: TaskRepository,
    notifier: Notifier,
    filter: Filter,
    editing: Option<String>,
}

impl TodoApp {
    /// Load the repository from `store`, warning if it could not be read
    pub fn new(store: TaskStore, settings: NotificationConfig) -> Self {
        let (repo, load_error) = TaskRepository::open(store);
        let mut app = Self {
            repo,
            notifier: Notifier::new(settings),
            filter: Filter::default(),
            editing: None,
        };

        if let Some(e) = load_error {
            warn!(error = %e, "Starting with an empty task list");
            app.post("Error loading tasks!", Severity::Error);
        }
        app
    }

    pub fn repository(&self) -> &TaskRepository {
        &self.repo
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut Notifier {
        &mut self.notifier
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: Filter) {
        debug!(%filter, "Filter changed");
        self.filter = filter;
    }

    /// Current display state
    pub fn render(&self, now: DateTime<Utc>) -> RenderModel {
        view::project(self.repo.tasks(), self.filter, now)
    }

    pub fn add(&mut self, text: &str) -> Result<Task> {
        match self.repo.create(text) {
            Ok(created) => {
                let task = self.finish(created);
                self.post("Task added successfully!", Severity::Success);
                Ok(task)
            }
            Err(e) => {
                self.post_validation(&e);
                Err(e)
            }
        }
    }

    pub fn toggle(&mut self, id: &str) -> Result<Task> {
        let toggled = self.repo.toggle_completion(id).inspect_err(|e| {
            debug!(id, error = %e, "Ignoring toggle of unknown task");
        })?;
        let task = self.finish(toggled);

        let action = if task.completed { "completed" } else { "uncompleted" };
        self.post(format!("Task {}!", action), Severity::Success);
        Ok(task)
    }

    /// Delete after confirmation; `Ok(None)` when the user declined
    pub fn delete(&mut self, id: &str, confirm: &mut dyn Confirm) -> Result<Option<Task>> {
        if self.repo.get(id).is_none() {
            debug!(id, "Ignoring delete of unknown task");
            return Err(TodoError::NotFound(id.to_string()));
        }
        if !confirm.confirm("Are you sure you want to delete this task?") {
            return Ok(None);
        }

        let deleted = self.repo.delete(id)?;
        let task = self.finish(deleted);
        if self.editing.as_deref() == Some(task.id.as_str()) {
            self.editing = None;
        }
        self.post("Task deleted!", Severity::Success);
        Ok(Some(task))
    }

    /// Open an edit session, returning the text to prefill
    pub fn begin_edit(&mut self, id: &str) -> Option<String> {
        let text = self.repo.get(id)?.text.clone();
        self.editing = Some(id.to_string());
        Some(text)
    }

    /// Id of the task being edited, if any
    pub fn editing(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Save the open edit session; validation errors keep it open
    pub fn save_edit(&mut self, text: &str) -> Result<Task> {
        let Some(id) = self.editing.clone() else {
            return Err(TodoError::NotFound("no task is being edited".to_string()));
        };

        match self.repo.edit(&id, text) {
            Ok(edited) => {
                let task = self.finish(edited);
                self.editing = None;
                self.post("Task updated successfully!", Severity::Success);
                Ok(task)
            }
            Err(e @ TodoError::Validation(_)) => {
                self.post_validation(&e);
                Err(e)
            }
            Err(e) => {
                self.editing = None;
                Err(e)
            }
        }
    }

    /// Remove completed tasks after confirmation, returning how many went
    pub fn clear_completed(&mut self, confirm: &mut dyn Confirm) -> usize {
        let count = self.repo.stats().completed;
        if count == 0 {
            self.post("No completed tasks to clear!", Severity::Info);
            return 0;
        }

        let prompt = format!("Are you sure you want to delete {} completed task(s)?", count);
        if !confirm.confirm(&prompt) {
            return 0;
        }

        let cleared = self.repo.clear_completed();
        let removed = self.finish(cleared);
        self.post(format!("{} completed task(s) cleared!", removed), Severity::Success);
        removed
    }

    /// Write a dated backup into `dir`, returning the path written
    pub fn export(&mut self, today: NaiveDate, dir: &Path) -> Result<PathBuf> {
        let written = transfer::export_all(self.repo.tasks(), today)
            .and_then(|file| file.write_to(dir));
        match written {
            Ok(path) => {
                self.post("Tasks exported successfully!", Severity::Success);
                Ok(path)
            }
            Err(e) => {
                warn!(dir = ?dir, error = %e, "Export failed");
                self.post("Error exporting tasks!", Severity::Error);
                Err(e)
            }
        }
    }

    /// Replace the whole collection with a backup; rejected files change nothing
    pub fn import(&mut self, file: &ImportFile) -> Result<usize> {
        match transfer::import_all(file, Utc::now()) {
            Ok(tasks) => {
                let replaced = self.repo.replace_all(tasks);
                let count = self.finish(replaced);
                self.editing = None;
                self.post("Tasks imported successfully!", Severity::Success);
                Ok(count)
            }
            Err(e) => {
                warn!(error = %e, "Import rejected");
                self.post("Invalid file format!", Severity::Error);
                Err(e)
            }
        }
    }

    fn finish<T>(&mut self, persisted: Persisted<T>) -> T {
        if let Some(e) = &persisted.io_error {
            warn!(error = %e, "Change applied but not saved");
            self.post("Error saving tasks!", Severity::Error);
        }
        persisted.value
    }

    fn post_validation(&mut self, error: &TodoError) {
        let message = match error {
            TodoError::Validation(ValidationError::Empty) => "Please enter a task!".to_string(),
            TodoError::Validation(ValidationError::TooLong { max, .. }) => {
                format!("Task is too long! Maximum {} characters.", max)
            }
            other => other.to_string(),
        };
        self.post(message, Severity::Error);
    }

    fn post(&mut self, message: impl Into<String>, severity: Severity) {
        self.notifier.notify(message, severity, now_ms());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DEFAULT_SLOT_KEY, MemoryBackend, SlotBackend};
    use std::fs;
    use tempfile::TempDir;

    fn app_with(backend: MemoryBackend) -> (TodoApp, MemoryBackend) {
        let store = TaskStore::new(Box::new(backend.clone()), DEFAULT_SLOT_KEY);
        (TodoApp::new(store, NotificationConfig::default()), backend)
    }

    fn app() -> (TodoApp, MemoryBackend) {
        app_with(MemoryBackend::new())
    }

    fn jan_31() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()
    }

    fn messages(app: &mut TodoApp) -> Vec<(String, Severity)> {
        app.notifier_mut()
            .drain()
            .into_iter()
            .map(|n| (n.message, n.severity))
            .collect()
    }

    fn yes(_: &str) -> bool {
        true
    }

    fn no(_: &str) -> bool {
        false
    }

    #[test]
    fn test_add_notifies_success() {
        let (mut app, _) = app();
        let task = app.add("Buy milk").unwrap();
        assert_eq!(task.text, "Buy milk");
        assert_eq!(
            messages(&mut app),
            vec![("Task added successfully!".to_string(), Severity::Success)]
        );
    }

    #[test]
    fn test_add_validation_messages() {
        let (mut app, _) = app();
        assert!(app.add("   ").is_err());
        assert!(app.add(&"x".repeat(101)).is_err());
        assert!(app.repository().is_empty());
        assert_eq!(
            messages(&mut app),
            vec![
                ("Please enter a task!".to_string(), Severity::Error),
                ("Task is too long! Maximum 100 characters.".to_string(), Severity::Error),
            ]
        );
    }

    #[test]
    fn test_toggle_messages_and_unknown_id() {
        let (mut app, _) = app();
        let task = app.add("t").unwrap();
        app.notifier_mut().drain();

        app.toggle(&task.id).unwrap();
        app.toggle(&task.id).unwrap();
        assert!(matches!(app.toggle("missing"), Err(TodoError::NotFound(_))));

        let texts: Vec<String> = messages(&mut app).into_iter().map(|(m, _)| m).collect();
        assert_eq!(texts, vec!["Task completed!", "Task uncompleted!"]);
    }

    #[test]
    fn test_delete_requires_confirmation() {
        let (mut app, _) = app();
        let task = app.add("t").unwrap();

        let mut prompts = Vec::new();
        let mut decline = |p: &str| {
            prompts.push(p.to_string());
            false
        };
        assert_eq!(app.delete(&task.id, &mut decline).unwrap(), None);
        assert_eq!(prompts, vec!["Are you sure you want to delete this task?"]);
        assert_eq!(app.repository().len(), 1);

        let deleted = app.delete(&task.id, &mut yes).unwrap();
        assert_eq!(deleted.map(|t| t.id), Some(task.id.clone()));
        assert!(app.repository().is_empty());

        assert!(matches!(app.delete(&task.id, &mut yes), Err(TodoError::NotFound(_))));
    }

    #[test]
    fn test_edit_session() {
        let (mut app, _) = app();
        let task = app.add("old").unwrap();

        assert_eq!(app.begin_edit(&task.id).as_deref(), Some("old"));
        assert_eq!(app.editing(), Some(task.id.as_str()));

        // Invalid text keeps the session open
        assert!(app.save_edit("  ").is_err());
        assert_eq!(app.editing(), Some(task.id.as_str()));

        let edited = app.save_edit("new").unwrap();
        assert_eq!(edited.text, "new");
        assert!(app.editing().is_none());

        app.begin_edit(&task.id);
        app.cancel_edit();
        assert!(app.editing().is_none());
        assert!(app.save_edit("whatever").is_err());
        assert_eq!(app.repository().tasks()[0].text, "new");
    }

    #[test]
    fn test_begin_edit_unknown_task() {
        let (mut app, _) = app();
        assert!(app.begin_edit("missing").is_none());
        assert!(app.editing().is_none());
    }

    #[test]
    fn test_clear_completed_flow() {
        let (mut app, _) = app();
        let done = app.add("done").unwrap();
        app.add("open").unwrap();
        app.notifier_mut().drain();

        assert_eq!(app.clear_completed(&mut yes), 0);
        assert_eq!(
            messages(&mut app),
            vec![("No completed tasks to clear!".to_string(), Severity::Info)]
        );

        app.toggle(&done.id).unwrap();
        assert_eq!(app.clear_completed(&mut no), 0);
        assert_eq!(app.repository().len(), 2);
        app.notifier_mut().drain();

        assert_eq!(app.clear_completed(&mut yes), 1);
        assert_eq!(app.repository().stats().completed, 0);
        assert_eq!(
            messages(&mut app),
            vec![("1 completed task(s) cleared!".to_string(), Severity::Success)]
        );
    }

    #[test]
    fn test_save_failure_warns_but_applies() {
        let (mut app, _) = app_with(MemoryBackend::with_quota(1));

        app.add("kept in memory").unwrap();
        assert_eq!(app.repository().len(), 1);
        let texts: Vec<String> = messages(&mut app).into_iter().map(|(m, _)| m).collect();
        assert_eq!(texts, vec!["Error saving tasks!", "Task added successfully!"]);
    }

    #[test]
    fn test_load_failure_notifies() {
        let mut backend = MemoryBackend::new();
        backend.set(DEFAULT_SLOT_KEY, "not json").unwrap();
        let mut app = TodoApp::new(
            TaskStore::new(Box::new(backend), DEFAULT_SLOT_KEY),
            NotificationConfig::default(),
        );

        assert!(app.repository().is_empty());
        assert_eq!(
            messages(&mut app),
            vec![("Error loading tasks!".to_string(), Severity::Error)]
        );
    }

    #[test]
    fn test_import_replaces_and_persists() {
        let (mut app, backend) = app();
        app.add("old").unwrap();

        let file = ImportFile::new("application/json", r#"[{"id":"1","text":"x"}]"#);
        assert_eq!(app.import(&file).unwrap(), 1);

        let task = &app.repository().tasks()[0];
        assert_eq!(task.id, "1");
        assert!(!task.completed);

        let reloaded = TaskStore::new(Box::new(backend), DEFAULT_SLOT_KEY).load().unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded[0].id, "1");
    }

    #[test]
    fn test_import_rejection_leaves_collection() {
        let (mut app, _) = app();
        app.add("keep").unwrap();
        let before = app.repository().tasks().to_vec();
        app.notifier_mut().drain();

        let file = ImportFile::new("application/json", r#"{"not":"an array"}"#);
        assert!(matches!(app.import(&file), Err(TodoError::Format(_))));
        assert_eq!(app.repository().tasks(), before.as_slice());
        assert_eq!(
            messages(&mut app),
            vec![("Invalid file format!".to_string(), Severity::Error)]
        );
    }

    #[test]
    fn test_import_undecodable_file_is_invalid_format() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("backup.json");
        fs::write(&path, [0x5b, 0xff, 0xfe, 0x5d]).unwrap();

        let (mut app, _) = app();
        app.add("keep").unwrap();
        app.notifier_mut().drain();

        let file = ImportFile::read(&path).unwrap();
        assert!(matches!(app.import(&file), Err(TodoError::Format(_))));
        assert_eq!(app.repository().len(), 1);
        assert_eq!(
            messages(&mut app),
            vec![("Invalid file format!".to_string(), Severity::Error)]
        );
    }

    #[test]
    fn test_export_writes_file_then_notifies() {
        let temp = TempDir::new().unwrap();
        let (mut app, _) = app();
        app.add("a").unwrap();
        app.notifier_mut().drain();

        let path = app.export(jan_31(), temp.path()).unwrap();
        assert!(path.ends_with("todo-backup-2024-01-31.json"));
        assert!(fs::read_to_string(&path).unwrap().contains("\"text\": \"a\""));
        assert_eq!(
            messages(&mut app),
            vec![("Tasks exported successfully!".to_string(), Severity::Success)]
        );
    }

    #[test]
    fn test_export_write_failure_reports_error() {
        let temp = TempDir::new().unwrap();
        let not_a_dir = temp.path().join("plain-file");
        fs::write(&not_a_dir, "occupied").unwrap();

        let (mut app, _) = app();
        app.add("a").unwrap();
        app.notifier_mut().drain();

        assert!(matches!(app.export(jan_31(), &not_a_dir), Err(TodoError::Io(_))));
        assert_eq!(
            messages(&mut app),
            vec![("Error exporting tasks!".to_string(), Severity::Error)]
        );
    }

    #[test]
    fn test_render_follows_filter() {
        let (mut app, _) = app();
        app.add("a").unwrap();
        let b = app.add("b").unwrap();
        app.toggle(&b.id).unwrap();

        app.set_filter(Filter::Active);
        let model = app.render(Utc::now());
        assert_eq!(model.filter, Filter::Active);
        assert_eq!(model.tasks.len(), 1);
        assert_eq!(model.tasks[0].text_html, "a");
        assert_eq!(model.stats.total, 2);
        assert!(model.can_clear_completed);
    }
}
