//! Vector similarity search over stored chunks.
//!
//! Chunks are scanned from the [`DocumentStore`] and ranked in process by
//! cosine distance to the query embedding. Ties keep insertion order.

use std::sync::Arc;

use ragdesk_core::{DocumentStore, Embedder, ScoredChunk};
use tracing::{debug, warn};

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if the lengths differ, or either vector is empty or zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Cosine distance: `1 - cosine_similarity`, in [0, 2]. Smaller is closer.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

/// Similarity search over one assistant's chunks.
#[derive(Clone)]
pub struct VectorStore {
    documents: Arc<dyn DocumentStore>,
    embedder: Arc<dyn Embedder>,
}

impl VectorStore {
    pub fn new(documents: Arc<dyn DocumentStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { documents, embedder }
    }

    /// The `top_k` chunk texts closest to `query`, nearest first.
    pub async fn search(
        &self,
        query: &str,
        assistant: &str,
        owner: Option<&str>,
        top_k: usize,
    ) -> ragdesk_core::Result<Vec<String>> {
        let scored = self.search_scored(query, assistant, owner, top_k).await?;
        Ok(scored.into_iter().map(|s| s.chunk.content).collect())
    }

    /// Like [`search`](Self::search), keeping each chunk and its distance.
    pub async fn search_scored(
        &self,
        query: &str,
        assistant: &str,
        owner: Option<&str>,
        top_k: usize,
    ) -> ragdesk_core::Result<Vec<ScoredChunk>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;
        let chunks = self.documents.scan_chunks(assistant, owner).await?;

        let mut skipped = 0usize;
        let mut scored: Vec<ScoredChunk> = chunks
            .into_iter()
            .filter_map(|chunk| {
                if chunk.embedding.len() != query_embedding.len() {
                    skipped += 1;
                    return None;
                }
                let distance = cosine_distance(&chunk.embedding, &query_embedding);
                Some(ScoredChunk { chunk, distance })
            })
            .collect();

        if skipped > 0 {
            warn!(
                assistant,
                skipped,
                dims = query_embedding.len(),
                "Skipped chunks with mismatched embedding dimensions"
            );
        }

        // Stable sort: equal distances stay in insertion order.
        scored.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);

        debug!(assistant, hits = scored.len(), "Vector search complete");
        Ok(scored)
    }
}
