//! Persisted UI color theme shared by every tool.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::app_dir;
use crate::error::ConfigError;

pub const DEFAULT_THEME: &str = "DarkGrey9";

const THEME_FILE: &str = "theme_config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeConfig {
    pub theme: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            theme: DEFAULT_THEME.to_string(),
        }
    }
}

pub fn theme_path() -> Result<PathBuf, ConfigError> {
    Ok(app_dir()?.join(THEME_FILE))
}

/// Theme name stored at `path`, or the default when the file is missing,
/// unreadable, or holds a blank name
pub fn load_theme(path: &Path) -> String {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => return DEFAULT_THEME.to_string(),
    };

    match serde_json::from_str::<ThemeConfig>(&content) {
        Ok(config) if !config.theme.trim().is_empty() => config.theme,
        Ok(_) => DEFAULT_THEME.to_string(),
        Err(e) => {
            tracing::warn!("Ignoring theme file {}: {}", path.display(), e);
            DEFAULT_THEME.to_string()
        }
    }
}

pub fn save_theme(path: &Path, name: &str) -> Result<(), ConfigError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ConfigError::Invalid("theme name is empty".to_string()));
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ConfigError::DirectoryCreationFailed {
            path: parent.display().to_string(),
            source,
        })?;
    }

    let config = ThemeConfig {
        theme: name.to_string(),
    };
    let json = serde_json::to_string_pretty(&config).map_err(|e| ConfigError::SaveFailed {
        path: path.display().to_string(),
        source: Box::new(e),
    })?;
    fs::write(path, json).map_err(|e| ConfigError::SaveFailed {
        path: path.display().to_string(),
        source: Box::new(e),
    })?;

    tracing::info!("Theme set to {}", name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("d4_assistant_theme_{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_missing_file_uses_default() {
        assert_eq!(load_theme(&temp_path("does_not_exist.json")), DEFAULT_THEME);
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("theme_config.json");
        save_theme(&path, " LightGreen2 ").unwrap();
        assert_eq!(load_theme(&path), "LightGreen2");

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"theme\": \"LightGreen2\""));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_blank_name_rejected() {
        let path = temp_path("blank.json");
        assert!(matches!(save_theme(&path, "   "), Err(ConfigError::Invalid(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_corrupt_file_uses_default() {
        let path = temp_path("corrupt.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "[1, 2").unwrap();
        assert_eq!(load_theme(&path), DEFAULT_THEME);

        fs::write(&path, r#"{"theme": ""}"#).unwrap();
        assert_eq!(load_theme(&path), DEFAULT_THEME);

        let _ = fs::remove_file(&path);
    }
}
