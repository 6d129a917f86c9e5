//! Assistant catalogs.
//!
//! [`DirectoryCatalog`] reads one `<name>.toml` file per assistant from a
//! directory; [`StaticCatalog`] holds records in memory for tests and
//! embedded use.

use async_trait::async_trait;
use ragdesk_core::{AssistantCatalog, AssistantConfig, Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

const EXTENSION: &str = "toml";

/// One TOML file per assistant scope.
#[derive(Debug, Clone)]
pub struct DirectoryCatalog {
    dir: PathBuf,
}

impl DirectoryCatalog {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Parse and validate one assistant record.
    pub fn parse(name: &str, content: &str) -> Result<AssistantConfig> {
        let mut config: AssistantConfig = toml::from_str(content).map_err(|e| Error::Config {
            message: format!("assistant '{name}': {e}"),
        })?;
        config.name = name.to_string();
        config.validate().map_err(|message| Error::Config {
            message: format!("assistant '{name}': {message}"),
        })?;
        Ok(config)
    }
}

/// Scope names double as file stems, so only plain identifiers are accepted.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[async_trait]
impl AssistantCatalog for DirectoryCatalog {
    async fn load(&self, name: &str) -> Result<Option<AssistantConfig>> {
        if !is_valid_name(name) {
            return Ok(None);
        }
        let path = self.dir.join(format!("{name}.{EXTENSION}"));
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        debug!(assistant = name, path = %path.display(), "Loaded assistant config");
        Self::parse(name, &content).map(Some)
    }

    async fn names(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == EXTENSION) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    if is_valid_name(stem) {
                        names.push(stem.to_string());
                    }
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

/// An in-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    assistants: BTreeMap<String, AssistantConfig>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an assistant; its `name` is the scope key.
    pub fn with(mut self, config: AssistantConfig) -> Self {
        self.assistants.insert(config.name.clone(), config);
        self
    }
}

#[async_trait]
impl AssistantCatalog for StaticCatalog {
    async fn load(&self, name: &str) -> Result<Option<AssistantConfig>> {
        Ok(self.assistants.get(name).cloned())
    }

    async fn names(&self) -> Result<Vec<String>> {
        Ok(self.assistants.keys().cloned().collect())
    }
}
