//! Configuration loading, validation, and management for ragdesk.
//!
//! Loads application configuration from `ragdesk.toml` with environment
//! variable overrides, and exposes the directory of per-assistant records
//! as an [`AssistantCatalog`](ragdesk_core::AssistantCatalog).

pub mod catalog;

pub use catalog::{DirectoryCatalog, StaticCatalog};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `ragdesk.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Provider name ("openai", "openrouter", "ollama", ...)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Overrides the provider's well-known base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Chat model used for answers and summaries
    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// Embeddings model; "hash" or "hash:<dims>" selects the local hashing embedder
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Max tokens per generated answer
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub ingestion: IngestionConfig,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_chat_model() -> String {
    "gpt-4o-mini".into()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_max_tokens() -> u32 {
    1024
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("api_url", &self.api_url)
            .field("chat_model", &self.chat_model)
            .field("embedding_model", &self.embedding_model)
            .field("max_tokens", &self.max_tokens)
            .field("paths", &self.paths)
            .field("memory", &self.memory)
            .field("ingestion", &self.ingestion)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding one `<assistant>.toml` per assistant
    #[serde(default = "default_configs_dir")]
    pub configs_dir: PathBuf,

    /// Directory holding one sub-directory of `.txt` documents per assistant
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// SQLite database file
    #[serde(default = "default_database")]
    pub database: PathBuf,
}

fn default_configs_dir() -> PathBuf {
    PathBuf::from("configs")
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_database() -> PathBuf {
    PathBuf::from("ragdesk.sqlite")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            configs_dir: default_configs_dir(),
            data_dir: default_data_dir(),
            database: default_database(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// "sqlite" or "in_memory"
    #[serde(default = "default_memory_backend")]
    pub backend: String,

    /// Messages replayed to the generator per query
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Non-system messages that trigger summarization
    #[serde(default = "default_summary_threshold")]
    pub summary_threshold: usize,

    /// Run summarization on a spawned task instead of inline
    #[serde(default)]
    pub background_summarization: bool,
}

fn default_memory_backend() -> String {
    "sqlite".into()
}
fn default_history_limit() -> usize {
    10
}
fn default_summary_threshold() -> usize {
    20
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: default_memory_backend(),
            history_limit: default_history_limit(),
            summary_threshold: default_summary_threshold(),
            background_summarization: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Chunk embeddings in flight per document
    #[serde(default = "default_embed_concurrency")]
    pub embed_concurrency: usize,
}

fn default_embed_concurrency() -> usize {
    4
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            embed_concurrency: default_embed_concurrency(),
        }
    }
}

impl AppConfig {
    /// Default config file name, looked up in the working directory.
    pub const FILE_NAME: &'static str = "ragdesk.toml";

    /// Load configuration from `path` (or `./ragdesk.toml`) and apply
    /// environment variable overrides.
    ///
    /// - `RAGDESK_API_KEY`, then `OPENAI_API_KEY` (only when no key is configured)
    /// - `RAGDESK_PROVIDER`, `RAGDESK_CHAT_MODEL`, `RAGDESK_EMBEDDING_MODEL`
    /// - `RAGDESK_DATABASE`
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(Self::FILE_NAME));
        let mut config = Self::load_from(&path)?;
        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path, without env overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = var("RAGDESK_API_KEY").or_else(|| var("OPENAI_API_KEY"));
        }
        if let Some(provider) = var("RAGDESK_PROVIDER") {
            self.provider = provider;
        }
        if let Some(model) = var("RAGDESK_CHAT_MODEL") {
            self.chat_model = model;
        }
        if let Some(model) = var("RAGDESK_EMBEDDING_MODEL") {
            self.embedding_model = model;
        }
        if let Some(db) = var("RAGDESK_DATABASE") {
            self.paths.database = PathBuf::from(db);
        }
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.memory.history_limit == 0 {
            return Err(ConfigError::ValidationError(
                "memory.history_limit must be at least 1".into(),
            ));
        }
        if self.memory.summary_threshold < 2 {
            return Err(ConfigError::ValidationError(
                "memory.summary_threshold must be at least 2".into(),
            ));
        }
        if self.ingestion.embed_concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "ingestion.embed_concurrency must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// The catalog backed by `paths.configs_dir`.
    pub fn catalog(&self) -> DirectoryCatalog {
        DirectoryCatalog::new(&self.paths.configs_dir)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: default_provider(),
            api_url: None,
            chat_model: default_chat_model(),
            embedding_model: default_embedding_model(),
            max_tokens: default_max_tokens(),
            paths: PathsConfig::default(),
            memory: MemoryConfig::default(),
            ingestion: IngestionConfig::default(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for ragdesk_core::Error {
    fn from(err: ConfigError) -> Self {
        ragdesk_core::Error::Config {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.memory.history_limit, 10);
        assert_eq!(config.memory.summary_threshold, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.chat_model, config.chat_model);
        assert_eq!(parsed.paths.database, config.paths.database);
    }

    #[test]
    fn summary_threshold_below_two_rejected() {
        let mut config = AppConfig::default();
        config.memory.summary_threshold = 1;
        assert!(config.validate().is_err());
        config.memory.summary_threshold = 2;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/ragdesk.toml")).unwrap();
        assert_eq!(config.embedding_model, "text-embedding-3-small");
    }

    #[test]
    fn parses_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ragdesk.toml");
        std::fs::write(
            &path,
            "provider = \"ollama\"\n[memory]\nbackend = \"in_memory\"\nsummary_threshold = 6\n",
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.memory.backend, "in_memory");
        assert_eq!(config.memory.summary_threshold, 6);
        assert_eq!(config.memory.history_limit, 10);
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("OPENAI_API_KEY", "sk-env"),
            ("RAGDESK_CHAT_MODEL", "gpt-4o"),
            ("RAGDESK_DATABASE", "/tmp/rag.sqlite"),
        ]);
        let mut config = AppConfig::default();
        config.apply_env(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.chat_model, "gpt-4o");
        assert_eq!(config.paths.database, PathBuf::from("/tmp/rag.sqlite"));
    }

    #[test]
    fn configured_key_beats_env() {
        let mut config = AppConfig {
            api_key: Some("sk-file".into()),
            ..AppConfig::default()
        };
        config.apply_env(|name| (name == "RAGDESK_API_KEY").then(|| "sk-env".to_string()));
        assert_eq!(config.api_key.as_deref(), Some("sk-file"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
