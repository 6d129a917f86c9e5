//! Wiring: builds stores, provider, embedder and pipeline from `AppConfig`.

use std::path::Path;
use std::sync::Arc;

use ragdesk_agent::{ConversationMemory, DocumentIngestor, RagPipeline};
use ragdesk_config::{AppConfig, DirectoryCatalog};
use ragdesk_core::{DocumentStore, Embedder, MessageStore, Provider};
use ragdesk_memory::{InMemoryStore, SqliteStore, VectorStore};
use tracing::debug;

pub struct Runtime {
    pub config: AppConfig,
    pub documents: Arc<dyn DocumentStore>,
    pub messages: Arc<dyn MessageStore>,
    pub provider: Arc<dyn Provider>,
    pub embedder: Arc<dyn Embedder>,
    pub catalog: Arc<DirectoryCatalog>,
}

impl Runtime {
    pub async fn load(config_path: Option<&Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let config = AppConfig::load(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
        Self::build(config).await
    }

    pub async fn build(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let (documents, messages): (Arc<dyn DocumentStore>, Arc<dyn MessageStore>) =
            match config.memory.backend.as_str() {
                "in_memory" => {
                    let store = Arc::new(InMemoryStore::new());
                    (store.clone(), store)
                }
                "sqlite" => {
                    let url = format!("sqlite://{}", config.paths.database.display());
                    let store = Arc::new(SqliteStore::new(&url).await?);
                    (store.clone(), store)
                }
                other => return Err(format!("Unknown memory backend '{other}'").into()),
            };

        let provider = ragdesk_providers::build_provider(&config)?;
        let embedder = ragdesk_providers::build_embedder(&config, provider.clone())?;
        let catalog = Arc::new(config.catalog());

        debug!(
            store = documents.name(),
            provider = provider.name(),
            embedder = embedder.name(),
            "Runtime ready"
        );

        Ok(Self {
            config,
            documents,
            messages,
            provider,
            embedder,
            catalog,
        })
    }

    pub fn ingestor(&self) -> DocumentIngestor {
        DocumentIngestor::new(self.documents.clone(), self.embedder.clone())
            .with_embed_concurrency(self.config.ingestion.embed_concurrency)
    }

    pub fn pipeline(&self) -> RagPipeline {
        let memory = ConversationMemory::new(
            self.messages.clone(),
            self.provider.clone(),
            &self.config.chat_model,
        )
        .with_threshold(self.config.memory.summary_threshold);

        RagPipeline::new(
            self.catalog.clone(),
            VectorStore::new(self.documents.clone(), self.embedder.clone()),
            memory,
            self.provider.clone(),
            &self.config.chat_model,
        )
        .with_max_tokens(self.config.max_tokens)
        .with_history_limit(self.config.memory.history_limit)
        .with_background_summarization(self.config.memory.background_summarization)
    }
}
