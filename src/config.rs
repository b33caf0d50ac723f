use crate::store::DEFAULT_SLOT_KEY;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub storage: StorageConfig,
    pub notifications: NotificationConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub store_dir: PathBuf,
    pub slot_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            store_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("tasklist"),
            slot_key: DEFAULT_SLOT_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// How long a notification stays fully visible
    pub display_ms: u64,
    /// Length of the exit transition before removal
    pub exit_ms: u64,
    /// Maximum notifications held at once (0 = unbounded)
    pub max_visible: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            display_ms: 3000,
            exit_ms: 300,
            max_visible: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("warn".to_string()),
            storage: StorageConfig::default(),
            notifications: NotificationConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let project_name = env!("CARGO_PKG_NAME");

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.log_level.as_deref(), Some("warn"));
        assert_eq!(config.storage.slot_key, "todoApp_tasks");
        assert!(config.storage.store_dir.ends_with("tasklist"));
        assert_eq!(config.notifications.display_ms, 3000);
        assert_eq!(config.notifications.exit_ms, 300);
        assert_eq!(config.notifications.max_visible, 5);
    }

    #[test]
    fn test_load_explicit_file_with_partial_sections() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tasklist.yml");
        fs::write(
            &path,
            "log_level: debug\nstorage:\n  store_dir: /tmp/tasks\nnotifications:\n  max_visible: 2\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.storage.store_dir, PathBuf::from("/tmp/tasks"));
        assert_eq!(config.storage.slot_key, "todoApp_tasks");
        assert_eq!(config.notifications.max_visible, 2);
        assert_eq!(config.notifications.display_ms, 3000);
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_load_explicit_invalid_yaml_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.yml");
        fs::write(&path, "notifications: [not, a, map]\n").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }
}
