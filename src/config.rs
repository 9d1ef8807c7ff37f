use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::corpus::Category;
use crate::corpus::library::DEFAULT_TEXT;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_text")]
    pub text: String,
    #[serde(default = "default_category")]
    pub category: Category,
    #[serde(default = "default_texts_dir")]
    pub texts_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_corpus_downloads_enabled")]
    pub corpus_downloads_enabled: bool,
}

fn default_theme() -> String {
    "catppuccin-mocha".to_string()
}
fn default_text() -> String {
    DEFAULT_TEXT.to_string()
}
fn default_category() -> Category {
    Category::Noun
}
fn default_texts_dir() -> String {
    data_dir().join("texts").to_string_lossy().to_string()
}
fn default_log_level() -> String {
    "warn".to_string()
}
fn default_corpus_downloads_enabled() -> bool {
    false
}

pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("grammaticus")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            text: default_text(),
            category: default_category(),
            texts_dir: default_texts_dir(),
            log_level: default_log_level(),
            corpus_downloads_enabled: default_corpus_downloads_enabled(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// A missing file yields the defaults; an unreadable or malformed one is
    /// an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("grammaticus")
            .join("config.toml")
    }

    pub fn texts_dir(&self) -> Option<PathBuf> {
        if self.texts_dir.trim().is_empty() {
            None
        } else {
            Some(PathBuf::from(&self.texts_dir))
        }
    }

    /// Validate `text` against the texts that exist, resetting to the bundled
    /// default if it names one that is gone.
    pub fn normalize_text(&mut self, valid_ids: &[String]) {
        if !valid_ids.iter().any(|id| *id == self.text) {
            self.text = default_text();
        }
    }
}
