//! Configuration system for storage, extraction, export and the assistant

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SheetChatConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

impl SheetChatConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: SheetChatConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Validate value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.assistant.preview_rows == 0 {
            anyhow::bail!("Configuration error: assistant.preview_rows must be at least 1");
        }
        if !(0.0..=2.0).contains(&self.assistant.temperature) {
            anyhow::bail!(
                "Configuration error: assistant.temperature must be within [0, 2], got {}",
                self.assistant.temperature
            );
        }
        if self.assistant.model.trim().is_empty() {
            anyhow::bail!("Configuration error: assistant.model must not be empty");
        }
        self.export.delimiter_byte()?;
        Ok(())
    }
}

/// Where files and extracted tables are persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file
    pub database: PathBuf,
    /// Directory receiving uploaded workbooks
    pub upload_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("sheetchat.db"),
            upload_dir: PathBuf::from("excel_uploads"),
        }
    }
}

/// What to do with a table containing a cell that cannot be normalized
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnserializablePolicy {
    /// Drop the containing table and keep extracting
    #[default]
    SkipTable,
    /// Abort the whole extraction call
    Fail,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub on_unserializable: UnserializablePolicy,
}

/// OpenAI-compatible chat-completions backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Number of records shown to the model
    pub preview_rows: usize,
    pub timeout_secs: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama3-70b-8192".to_string(),
            temperature: 0.1,
            api_key_env: "GROQ_API_KEY".to_string(),
            preview_rows: 10,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub delimiter: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            delimiter: ",".to_string(),
        }
    }
}

impl ExportConfig {
    /// The delimiter as a single byte
    pub fn delimiter_byte(&self) -> Result<u8> {
        match self.delimiter.as_bytes() {
            [b] if b.is_ascii() => Ok(*b),
            _ => anyhow::bail!(
                "Configuration error: export.delimiter must be a single ASCII character, got '{}'",
                self.delimiter
            ),
        }
    }
}
