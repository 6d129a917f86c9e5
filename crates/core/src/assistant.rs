//! Assistant configuration: one record per assistant scope.
//!
//! Records are loaded by an external [`AssistantCatalog`] and treated as
//! read-only input by the pipeline. Every field has a default, so an empty
//! file describes a usable assistant.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Retrieval parameters for one assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalSettings {
    /// Maximum characters per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Chunks retrieved per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}
fn default_top_k() -> usize {
    3
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
        }
    }
}

/// Generation parameters for one assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    #[serde(default = "default_persona")]
    pub persona: String,

    #[serde(default = "default_tone")]
    pub tone: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Replaces the composed system instruction entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

fn default_persona() -> String {
    "a helpful assistant".into()
}
fn default_tone() -> String {
    "neutral".into()
}
fn default_temperature() -> f32 {
    0.2
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            persona: default_persona(),
            tone: default_tone(),
            temperature: default_temperature(),
            system_prompt: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Scope name; filled in by the catalog from the record's key
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub retriever: RetrievalSettings,

    #[serde(default)]
    pub generation: GenerationSettings,
}

impl AssistantConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Check the invariants the chunker and generator rely on.
    pub fn validate(&self) -> Result<(), String> {
        let r = &self.retriever;
        if r.chunk_size == 0 {
            return Err("retriever.chunk_size must be at least 1".into());
        }
        if r.chunk_overlap >= r.chunk_size {
            return Err(format!(
                "retriever.chunk_overlap ({}) must be smaller than chunk_size ({})",
                r.chunk_overlap, r.chunk_size
            ));
        }
        if r.top_k == 0 {
            return Err("retriever.top_k must be at least 1".into());
        }
        let t = self.generation.temperature;
        if !(0.0..=2.0).contains(&t) {
            return Err("generation.temperature must be between 0.0 and 2.0".into());
        }
        Ok(())
    }
}

/// Where assistant configurations come from.
#[async_trait]
pub trait AssistantCatalog: Send + Sync {
    /// Load one assistant by scope name; `Ok(None)` when no record exists.
    async fn load(&self, name: &str) -> crate::Result<Option<AssistantConfig>>;

    /// Every known assistant scope, sorted.
    async fn names(&self) -> crate::Result<Vec<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_record_uses_pipeline_defaults() {
        let config: AssistantConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.retriever.chunk_size, 1000);
        assert_eq!(config.retriever.chunk_overlap, 200);
        assert_eq!(config.retriever.top_k, 3);
        assert!(config.generation.system_prompt.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk() {
        let mut config = AssistantConfig::named("shop");
        config.retriever.chunk_overlap = 1000;
        assert!(config.validate().unwrap_err().contains("chunk_overlap"));
    }

    #[test]
    fn temperature_range_enforced() {
        let mut config = AssistantConfig::named("shop");
        config.generation.temperature = 3.5;
        assert!(config.validate().is_err());
    }
}
