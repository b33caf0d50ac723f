// Backup file export and import

use crate::codec::{self, Decoded};
use crate::error::{Result, TodoError};
use crate::models::Task;
use chrono::{DateTime, NaiveDate, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Media type written on export and required on import
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// A downloadable backup of the whole collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub media_type: &'static str,
    pub contents: String,
}

impl ExportFile {
    /// Write the backup into `dir`, returning the full path
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        fs::write(&path, &self.contents)?;
        info!(path = ?path, bytes = self.contents.len(), "Wrote export file");
        Ok(path)
    }
}

/// A user-supplied backup awaiting validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFile {
    pub media_type: String,
    pub contents: String,
}

impl ImportFile {
    pub fn new(media_type: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            contents: contents.into(),
        }
    }

    /// Read a file from disk, declaring its media type from the extension
    ///
    /// Invalid UTF-8 is replaced rather than refused, so undecodable content
    /// is rejected by `import_all` as a format error.
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let contents = String::from_utf8_lossy(&bytes).into_owned();
        Ok(Self::new(media_type_for(path), contents))
    }
}

/// `todo-backup-YYYY-MM-DD.json`
pub fn export_file_name(today: NaiveDate) -> String {
    format!("todo-backup-{}.json", today.format("%Y-%m-%d"))
}

/// Serialize the full collection, pretty-printed, as a dated backup file
pub fn export_all(tasks: &[Task], today: NaiveDate) -> Result<ExportFile> {
    Ok(ExportFile {
        file_name: export_file_name(today),
        media_type: JSON_MEDIA_TYPE,
        contents: codec::encode_pretty(tasks)?,
    })
}

/// Validate a backup and turn it into tasks
///
/// Records are repaired the same way a store load repairs them; only the
/// media type and the top-level shape can reject the file.
pub fn import_all(file: &ImportFile, now: DateTime<Utc>) -> Result<Vec<Task>> {
    if !is_json_media_type(&file.media_type) {
        warn!(media_type = %file.media_type, "Rejected import with non-JSON media type");
        return Err(TodoError::Format(format!(
            "unsupported media type '{}', expected {}",
            file.media_type, JSON_MEDIA_TYPE
        )));
    }

    match codec::decode(&file.contents, now) {
        Ok(Decoded::Tasks(tasks, _)) => {
            info!(count = tasks.len(), "Parsed import file");
            Ok(tasks)
        }
        Ok(Decoded::NotAnArray(kind)) => Err(TodoError::Format(format!(
            "expected a top-level array of tasks, found {}",
            kind
        ))),
        Err(e) => Err(TodoError::Format(format!("file is not valid JSON: {}", e))),
    }
}

/// Accepts `application/json`, `text/json` and any `+json` structured suffix
pub fn is_json_media_type(media_type: &str) -> bool {
    let essence = media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.split_once('/') {
        Some(("application" | "text", "json")) => true,
        Some((_, subtype)) => subtype.ends_with("+json"),
        None => false,
    }
}

fn media_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()) {
        Some(ext) if ext == "json" => JSON_MEDIA_TYPE,
        Some(ext) if ext == "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}
