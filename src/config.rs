use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{MoodError, MoodResult};

/// Environment variables consulted, in order, when the config has no API key.
pub const API_KEY_ENV_VARS: &[&str] = &[
    "MOOD_QUOTE_API_KEY",
    "GEMINI_API_KEY",
    "GOOGLE_API_KEY",
    "OPENAI_API_KEY",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub ai: AiConfig,
    #[serde(default)]
    pub generation: GenerationSettings,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiConfig {
    pub provider: String,
    pub model: String,
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Sampling knobs forwarded to the model on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    pub temperature: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    pub max_tokens: u32,
    /// Model calls allowed per mood before giving up on malformed replies.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Where saved quotes are appended. `None` means the default under the
    /// config directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal_path: Option<PathBuf>,
    #[serde(default)]
    pub save_by_default: bool,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-1.5-flash-latest".to_string(),
            api_url: "https://generativelanguage.googleapis.com".to_string(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            top_k: None,
            top_p: None,
            max_tokens: 512,
            max_attempts: default_max_attempts(),
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> MoodResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            MoodError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> MoodResult<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".mood-quote")
    }

    pub fn get_config_path() -> PathBuf {
        Self::config_dir().join("config.yaml")
    }

    /// Load the config at `path` (or the default location), falling back to
    /// defaults when the file does not exist. A file that exists but fails to
    /// parse is an error.
    pub fn load_or_default(path: Option<&Path>) -> MoodResult<Self> {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::get_config_path);

        let mut config = if config_path.exists() {
            tracing::debug!(path = %config_path.display(), "loading config");
            Self::load_from_file(&config_path)?
        } else {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            Self::default()
        };

        config.apply_env_api_key();
        Ok(config)
    }

    pub fn save(&self) -> MoodResult<()> {
        self.save_to_file(Self::get_config_path())
    }

    /// Fill an empty API key from the first set environment variable.
    pub fn apply_env_api_key(&mut self) {
        if !self.ai.api_key.is_empty() {
            return;
        }
        if let Some(key) = API_KEY_ENV_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|value| !value.trim().is_empty())
        {
            self.ai.api_key = key;
        }
    }

    pub fn journal_path(&self) -> PathBuf {
        self.output
            .journal_path
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("quotes.jsonl"))
    }

    /// Where a quote should be saved. `requested` mirrors `--save [PATH]`:
    /// `Some(Some(path))` for an explicit file, `Some(None)` for the journal.
    pub fn save_target(&self, requested: Option<Option<PathBuf>>) -> Option<PathBuf> {
        match requested {
            Some(Some(path)) => Some(path),
            Some(None) => Some(self.journal_path()),
            None if self.output.save_by_default => Some(self.journal_path()),
            None => None,
        }
    }
}
