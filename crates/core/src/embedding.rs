//! Embedding gateway: converts text to fixed-length vectors.
//!
//! Callers only see this trait; whether vectors come from a remote
//! embeddings endpoint or a local hashing function is a wiring decision.
//! One instance always produces vectors of the same dimensionality.

use async_trait::async_trait;
use crate::error::EmbeddingError;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// A human-readable name (e.g., "openai:text-embedding-3-small").
    fn name(&self) -> &str;

    /// The vector length this instance produces, once known.
    fn dimensions(&self) -> Option<usize>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError>;
}
