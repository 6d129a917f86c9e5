//! Document ingestion: split, embed and persist documents.
//!
//! # Flow
//!
//! 1. Upsert the document row keyed by (assistant, filename, owner) and
//!    take that document's lock for the remaining steps
//! 2. If it already has chunks, only reconcile its status to `ready`
//! 3. Otherwise mark it `processing`, split the text, tag each chunk with
//!    its source filename and embed every chunk
//! 4. Persist all chunks in one batch and mark the document `ready`
//!
//! A failure in step 3 or 4 leaves the document `processing` with no chunks.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::{StreamExt, TryStreamExt, stream};
use ragdesk_core::{
    AssistantCatalog, AssistantConfig, Chunk, Document, DocumentStatus, DocumentStore, Embedder,
    Error, StoreError,
};
use ragdesk_memory::TextSplitter;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::locks::KeyedLocks;

/// Default number of chunk embeddings in flight per document.
pub const DEFAULT_EMBED_CONCURRENCY: usize = 4;

/// Result of ingesting one document.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    pub document: Document,
    /// Chunks the document holds after ingestion
    pub chunks: usize,
    /// `false` when the document was already embedded and only reconciled
    pub embedded: bool,
}

/// A document that could not be ingested during a directory load.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestFailure {
    pub filename: String,
    pub error: String,
}

/// What a directory load did for one assistant scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopeReport {
    pub assistant: String,
    /// The scope already had chunks, so nothing was loaded
    pub skipped: bool,
    pub documents: Vec<IngestOutcome>,
    pub failures: Vec<IngestFailure>,
}

impl ScopeReport {
    fn new(assistant: &str) -> Self {
        Self {
            assistant: assistant.to_string(),
            ..Self::default()
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.documents.iter().map(|d| d.chunks).sum()
    }
}

#[derive(Clone)]
pub struct DocumentIngestor {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn Embedder>,
    splitter: TextSplitter,
    embed_concurrency: usize,
    locks: KeyedLocks<String>,
}

impl DocumentIngestor {
    pub fn new(store: Arc<dyn DocumentStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            embedder,
            splitter: TextSplitter::default(),
            embed_concurrency: DEFAULT_EMBED_CONCURRENCY,
            locks: KeyedLocks::default(),
        }
    }

    /// Bound the number of concurrent embedding calls per document.
    pub fn with_embed_concurrency(mut self, n: usize) -> Self {
        self.embed_concurrency = n.max(1);
        self
    }

    pub fn with_splitter(mut self, splitter: TextSplitter) -> Self {
        self.splitter = splitter;
        self
    }

    /// A copy using the chunk settings of `config`.
    pub fn for_assistant(&self, config: &AssistantConfig) -> ragdesk_core::Result<Self> {
        let splitter = TextSplitter::new(config.retriever.chunk_size, config.retriever.chunk_overlap)
            .map_err(|e| Error::Config {
                message: format!("assistant '{}': {e}", config.name),
            })?;
        Ok(self.clone().with_splitter(splitter))
    }

    /// Ingest one document. Repeating the call for the same
    /// (assistant, filename, owner) never duplicates chunks.
    pub async fn add_document(
        &self,
        assistant: &str,
        filename: &str,
        content: &str,
        owner: Option<&str>,
    ) -> ragdesk_core::Result<IngestOutcome> {
        let mut document = self.store.upsert_document(assistant, filename, owner).await?;
        let _guard = self.locks.lock(&document.id).await;

        let existing = self.store.count_document_chunks(&document.id).await?;
        if existing > 0 {
            if document.status != DocumentStatus::Ready {
                self.store
                    .set_document_status(&document.id, DocumentStatus::Ready)
                    .await?;
                document.status = DocumentStatus::Ready;
            }
            debug!(assistant, filename, chunks = existing, "Document already embedded");
            return Ok(IngestOutcome {
                document,
                chunks: existing,
                embedded: false,
            });
        }

        self.store
            .set_document_status(&document.id, DocumentStatus::Processing)
            .await?;
        document.status = DocumentStatus::Processing;

        let chunks = match self.embed_chunks(&document, content).await {
            Ok(chunks) => chunks,
            Err(e) => {
                error!(assistant, filename, document = %document.id, error = %e, "Ingestion failed");
                return Err(e);
            }
        };
        let count = chunks.len();

        if let Err(e) = self.store.insert_chunks(chunks).await {
            error!(assistant, filename, document = %document.id, error = %e, "Chunk insert failed");
            return Err(e.into());
        }

        self.store
            .set_document_status(&document.id, DocumentStatus::Ready)
            .await?;
        document.status = DocumentStatus::Ready;

        info!(assistant, filename, chunks = count, "Document ingested");
        Ok(IngestOutcome {
            document,
            chunks: count,
            embedded: true,
        })
    }

    /// Split and embed `content`, preserving chunk order.
    async fn embed_chunks(&self, document: &Document, content: &str) -> ragdesk_core::Result<Vec<Chunk>> {
        let texts: Vec<String> = self
            .splitter
            .chunks(content)
            .filter(|c| !c.trim().is_empty())
            .map(|c| format!("{c}\n\nSource: {}", document.filename))
            .collect();

        let embedder = self.embedder.clone();
        let embeddings: Vec<Vec<f32>> = stream::iter(texts.clone())
            .map(move |text| {
                let embedder = embedder.clone();
                async move { embedder.embed(&text).await }
            })
            .buffered(self.embed_concurrency)
            .try_collect()
            .await?;

        Ok(texts
            .into_iter()
            .zip(embeddings)
            .map(|(text, embedding)| Chunk::new(document, text, embedding))
            .collect())
    }

    /// Load every `.txt` file under `dir` (recursively) as shared documents
    /// of `assistant`, named by their `/`-separated path relative to `dir`.
    /// Skipped entirely when the scope already has chunks.
    pub async fn load_and_embed_documents(
        &self,
        assistant: &str,
        dir: &Path,
    ) -> ragdesk_core::Result<ScopeReport> {
        let mut report = ScopeReport::new(assistant);

        if !tokio::fs::metadata(dir).await.map(|m| m.is_dir()).unwrap_or(false) {
            warn!(assistant, dir = %dir.display(), "Data directory not found");
            return Ok(report);
        }

        if self.store.count_assistant_chunks(assistant).await? > 0 {
            info!(assistant, "Documents already embedded, skipping load");
            report.skipped = true;
            return Ok(report);
        }

        let files = collect_text_files(dir).await?;
        if files.is_empty() {
            warn!(assistant, dir = %dir.display(), "No .txt documents found");
            return Ok(report);
        }

        for path in files {
            let filename = relative_name(dir, &path);

            let result = match tokio::fs::read_to_string(&path).await {
                Ok(content) => self.add_document(assistant, &filename, &content, None).await,
                Err(e) => Err(e.into()),
            };

            match result {
                Ok(outcome) => report.documents.push(outcome),
                Err(e) => {
                    warn!(assistant, file = %path.display(), error = %e, "Skipping document");
                    report.failures.push(IngestFailure {
                        filename,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            assistant,
            documents = report.documents.len(),
            chunks = report.chunk_count(),
            failures = report.failures.len(),
            "Directory load complete"
        );
        Ok(report)
    }

    /// Load `data_dir/<assistant>` for every assistant in the catalog, one
    /// task per assistant. A failing scope never aborts the others.
    pub async fn ingest_all(
        &self,
        catalog: &dyn AssistantCatalog,
        data_dir: &Path,
    ) -> ragdesk_core::Result<Vec<(String, ragdesk_core::Result<ScopeReport>)>> {
        let names = catalog.names().await?;
        let mut results = Vec::with_capacity(names.len());
        let mut tasks = JoinSet::new();

        for name in names {
            let ingestor = match catalog.load(&name).await {
                Ok(Some(config)) => self.for_assistant(&config),
                Ok(None) => Err(Error::AssistantNotFound(name.clone())),
                Err(e) => Err(e),
            };

            match ingestor {
                Ok(ingestor) => {
                    let dir = data_dir.join(&name);
                    tasks.spawn(async move {
                        let result = ingestor.load_and_embed_documents(&name, &dir).await;
                        (name, result)
                    });
                }
                Err(e) => {
                    error!(assistant = %name, error = %e, "Cannot ingest assistant");
                    results.push((name, Err(e)));
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, result)) => {
                    if let Err(e) = &result {
                        error!(assistant = %name, error = %e, "Assistant ingestion failed");
                    }
                    results.push((name, result));
                }
                Err(e) => error!(error = %e, "Ingestion task panicked"),
            }
        }

        results.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(results)
    }

    /// Documents of one assistant; `owner = Some(..)` restricts to that owner.
    pub async fn list_documents(
        &self,
        assistant: &str,
        owner: Option<&str>,
    ) -> ragdesk_core::Result<Vec<Document>> {
        Ok(self.store.list_documents(assistant, owner).await?)
    }

    /// Delete a document and its chunks. With `owner = Some(..)` only that
    /// owner's documents can be deleted; anything else is reported not found.
    pub async fn delete_document(
        &self,
        assistant: &str,
        document_id: &str,
        owner: Option<&str>,
    ) -> ragdesk_core::Result<Document> {
        let not_found = || Error::Persistence(StoreError::NotFound(format!("document {document_id}")));

        let document = self
            .store
            .get_document(document_id)
            .await?
            .filter(|d| d.assistant == assistant)
            .filter(|d| owner.is_none() || d.owner.as_deref() == owner)
            .ok_or_else(not_found)?;

        if !self.store.delete_document(document_id).await? {
            return Err(not_found());
        }

        info!(assistant, document = %document_id, filename = %document.filename, "Document deleted");
        Ok(document)
    }
}

/// `path` relative to `root`, with `/` separators on every platform.
fn relative_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// All `.txt` files under `dir`, recursively, in sorted path order.
async fn collect_text_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&current).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "txt") {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}
