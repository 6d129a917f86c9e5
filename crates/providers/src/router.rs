//! Provider router: builds the generation provider and embedder from config.

use std::sync::Arc;

use ragdesk_config::AppConfig;
use ragdesk_core::error::ProviderError;
use ragdesk_core::provider::Provider;
use ragdesk_core::Embedder;
use tracing::{info, warn};

use crate::embedder::{HashEmbedder, ProviderEmbedder};
use crate::openai_compat::OpenAiCompatProvider;

/// Build the configured generation provider.
pub fn build_provider(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let base_url = config
        .api_url
        .clone()
        .unwrap_or_else(|| default_base_url(&config.provider));

    let api_key = match (&config.api_key, config.provider.as_str()) {
        (Some(key), _) => key.clone(),
        (None, "ollama" | "vllm" | "llamacpp" | "llama.cpp") => config.provider.clone(),
        (None, _) => {
            warn!(provider = %config.provider, "No API key configured");
            String::new()
        }
    };

    let provider = OpenAiCompatProvider::new(&config.provider, base_url, api_key)?;
    info!(provider = %config.provider, base_url = provider.base_url(), "Provider configured");
    Ok(Arc::new(provider))
}

/// Build the configured embedder.
///
/// `embedding_model = "hash"` (or `"hash:<dims>"`) selects the local
/// [`HashEmbedder`]; anything else is sent to the provider's embeddings endpoint.
pub fn build_embedder(
    config: &AppConfig,
    provider: Arc<dyn Provider>,
) -> Result<Arc<dyn Embedder>, ProviderError> {
    let model = config.embedding_model.trim();

    if model == "hash" {
        return Ok(Arc::new(HashEmbedder::default()));
    }

    if let Some(dims) = model.strip_prefix("hash:") {
        let dims: usize = dims.parse().map_err(|_| {
            ProviderError::NotConfigured(format!("invalid hash embedder dimensions: {dims}"))
        })?;
        if dims == 0 {
            return Err(ProviderError::NotConfigured(
                "hash embedder dimensions must be > 0".into(),
            ));
        }
        return Ok(Arc::new(HashEmbedder::new(dims)));
    }

    Ok(Arc::new(ProviderEmbedder::new(provider, model)))
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "fireworks" => "https://api.fireworks.ai/inference/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => "https://api.openai.com/v1".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("openrouter").contains("openrouter.ai"));
        assert!(default_base_url("openai").contains("api.openai.com"));
        assert!(default_base_url("ollama").contains("localhost:11434"));
    }

    #[test]
    fn build_from_default_config() {
        let config = AppConfig::default();
        let provider = build_provider(&config).unwrap();
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn hash_embedding_model_selects_local_embedder() {
        let mut config = AppConfig::default();
        let provider = build_provider(&config).unwrap();

        config.embedding_model = "hash".into();
        let e = build_embedder(&config, provider.clone()).unwrap();
        assert_eq!(e.dimensions(), Some(HashEmbedder::DEFAULT_DIMENSIONS));

        config.embedding_model = "hash:32".into();
        let e = build_embedder(&config, provider.clone()).unwrap();
        assert_eq!(e.name(), "hash:32");

        config.embedding_model = "hash:zero".into();
        assert!(build_embedder(&config, provider).is_err());
    }

    #[test]
    fn remote_embedding_model_uses_provider() {
        let config = AppConfig::default();
        let provider = build_provider(&config).unwrap();
        let e = build_embedder(&config, provider).unwrap();
        assert_eq!(e.name(), "openai:text-embedding-3-small");
        assert_eq!(e.dimensions(), None);
    }
}
