use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs::try_exists;

use crate::layout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Pt,
    Es,
}

impl Language {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.to_lowercase().as_str() {
            "en" => Some(Language::En),
            "pt" => Some(Language::Pt),
            "es" => Some(Language::Es),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Pt => "pt",
            Language::Es => "es",
        }
    }
}

/// The single persistence boundary for application state: loaded once at
/// startup, saved whenever a field changes. Document history is never
/// part of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub language: Language,
    pub layout_id: String,
    pub focus_mode: bool,
    pub advanced_options: bool,
    pub editor: EditorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorConfig {
    pub tab_size: usize,
    pub use_spaces: bool,
    pub line_numbers: bool,
    pub highlight_current_line: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: Language::En,
            layout_id: layout::default_layout_id().to_string(),
            focus_mode: false,
            advanced_options: false,
            editor: EditorConfig {
                tab_size: 4,
                use_spaces: true,
                line_numbers: true,
                highlight_current_line: true,
            },
        }
    }
}

impl Config {
    pub async fn load() -> Result<Self> {
        if let Some(config_path) = Self::config_path() {
            if try_exists(&config_path).await? {
                match tokio::fs::read_to_string(&config_path).await {
                    Ok(content) => {
                        if content.trim().is_empty() {
                            log::warn!("Config file is empty, creating new one");
                            let default_config = Self::default();
                            let _ = default_config.save().await;
                            return Ok(default_config);
                        }

                        match serde_json::from_str::<Self>(&content) {
                            Ok(mut config) => {
                                config.validate();
                                log::info!(
                                    "Successfully loaded config from: {}",
                                    config_path.display()
                                );
                                return Ok(config);
                            }
                            Err(json_err) => {
                                log::error!("Failed to parse config file: {}", json_err);

                                // Keep the broken file around for inspection.
                                let backup_path = config_path.with_extension("bak");
                                if let Err(e) = tokio::fs::copy(&config_path, &backup_path).await {
                                    log::warn!("Failed to backup broken config: {}", e);
                                } else {
                                    log::info!(
                                        "Backed up broken config to: {}",
                                        backup_path.display()
                                    );
                                }

                                let default_config = Self::default();
                                let _ = default_config.save().await;
                                return Ok(default_config);
                            }
                        }
                    }
                    Err(io_err) => {
                        log::error!("Failed to read config file: {}", io_err);
                    }
                }
            } else {
                log::info!("Config file does not exist, creating default");
            }
        }

        let default_config = Self::default();
        let _ = default_config.save().await;
        Ok(default_config)
    }

    pub async fn save(&self) -> Result<()> {
        if let Some(config_path) = Self::config_path() {
            let mut config_to_save = self.clone();
            config_to_save.validate();

            if let Some(parent) = config_path.parent() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    anyhow::anyhow!(
                        "Failed to create config directory {}: {}",
                        parent.display(),
                        e
                    )
                })?;
            }

            let content = serde_json::to_string_pretty(&config_to_save)?;
            tokio::fs::write(&config_path, content).await.map_err(|e| {
                anyhow::anyhow!("Failed to write config {}: {}", config_path.display(), e)
            })?;
            log::info!("Successfully saved config to: {}", config_path.display());
        }
        Ok(())
    }

    /// Clamp out-of-range values back to sane defaults.
    pub fn validate(&mut self) {
        if self.editor.tab_size == 0 || self.editor.tab_size > 16 {
            log::warn!("Invalid tab size: {}, using default", self.editor.tab_size);
            self.editor.tab_size = 4;
        }

        if layout::layout_by_id(&self.layout_id).is_none() {
            log::warn!("Unknown layout id '{}', using default", self.layout_id);
            self.layout_id = layout::default_layout_id().to_string();
        }
    }

    fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("MDSTUDIO_CONFIG_PATH") {
            return Some(PathBuf::from(path));
        }

        if let Ok(dir) = std::env::var("MDSTUDIO_CONFIG_DIR") {
            return Some(PathBuf::from(dir).join("config.json"));
        }

        ProjectDirs::from("com", "mdstudio", "mdstudio")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};
    use tempfile::TempDir;

    fn config_test_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    fn set_config_dir(path: &std::path::Path) -> (Option<String>, Option<String>) {
        let previous_dir = std::env::var("MDSTUDIO_CONFIG_DIR").ok();
        let previous_path = std::env::var("MDSTUDIO_CONFIG_PATH").ok();
        std::env::set_var("MDSTUDIO_CONFIG_DIR", path);
        std::env::remove_var("MDSTUDIO_CONFIG_PATH");
        (previous_dir, previous_path)
    }

    fn restore_config_env(previous: (Option<String>, Option<String>)) {
        match previous.0 {
            Some(value) => std::env::set_var("MDSTUDIO_CONFIG_DIR", value),
            None => std::env::remove_var("MDSTUDIO_CONFIG_DIR"),
        }

        match previous.1 {
            Some(value) => std::env::set_var("MDSTUDIO_CONFIG_PATH", value),
            None => std::env::remove_var("MDSTUDIO_CONFIG_PATH"),
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.language, Language::En);
        assert!(!config.focus_mode);
        assert!(!config.advanced_options);
        assert_eq!(config.editor.tab_size, 4);
        assert!(config.editor.use_spaces);
        assert!(layout::layout_by_id(&config.layout_id).is_some());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();

        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("\"language\""));
        assert!(json.contains("\"layout_id\""));
        assert!(json.contains("\"focus_mode\""));

        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.language, config.language);
        assert_eq!(back.layout_id, config.layout_id);
    }

    #[test]
    fn test_language_round_trip() {
        for language in [Language::En, Language::Pt, Language::Es] {
            assert_eq!(Language::parse(language.tag()), Some(language));
        }
        assert_eq!(Language::parse("de"), None);

        let json = serde_json::to_string(&Language::Pt).unwrap();
        assert_eq!(json, "\"pt\"");
    }

    #[test]
    fn test_validate_fixes_bad_values() {
        let mut config = Config::default();
        config.editor.tab_size = 0;
        config.layout_id = String::from("no-such-layout");

        config.validate();
        assert_eq!(config.editor.tab_size, 4);
        assert!(layout::layout_by_id(&config.layout_id).is_some());
    }

    #[tokio::test]
    async fn test_config_load_default() {
        let (_temp_dir, previous_env) = {
            let _guard = config_test_lock().lock().unwrap();
            let temp_dir = TempDir::new().unwrap();
            let previous = set_config_dir(temp_dir.path());
            (temp_dir, previous)
        }; // release lock before await

        let config = Config::load().await.unwrap();
        assert_eq!(config.language, Language::En);
        assert!(!config.focus_mode);

        restore_config_env(previous_env);
    }
}
