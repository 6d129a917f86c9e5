//! Embedder implementations.
//!
//! - [`ProviderEmbedder`] sends each text to a provider's embeddings endpoint.
//! - [`HashEmbedder`] is a deterministic, offline feature-hashing embedder.
//!   It needs no network and is what tests and air-gapped installs use.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use ragdesk_core::error::EmbeddingError;
use ragdesk_core::provider::{EmbeddingRequest, Provider};
use ragdesk_core::Embedder;
use tracing::debug;

/// Embeds text through a [`Provider`]'s embeddings endpoint.
///
/// The first successful call fixes the dimensionality; any later vector of a
/// different length is rejected rather than silently stored.
pub struct ProviderEmbedder {
    provider: Arc<dyn Provider>,
    model: String,
    label: String,
    dimensions: OnceLock<usize>,
}

impl ProviderEmbedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        let model = model.into();
        let label = format!("{}:{}", provider.name(), model);
        Self {
            provider,
            model,
            label,
            dimensions: OnceLock::new(),
        }
    }
}

#[async_trait]
impl Embedder for ProviderEmbedder {
    fn name(&self) -> &str {
        &self.label
    }

    fn dimensions(&self) -> Option<usize> {
        self.dimensions.get().copied()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.model.clone(),
                inputs: vec![text.to_string()],
            })
            .await?;

        let vector = response
            .embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or(EmbeddingError::EmptyResponse)?;

        let expected = *self.dimensions.get_or_init(|| vector.len());
        if vector.len() != expected {
            return Err(EmbeddingError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }

        debug!(embedder = %self.label, dims = expected, "Embedded text");
        Ok(vector)
    }
}

/// Deterministic feature-hashing embedder.
///
/// Lower-cased words and byte bigrams are hashed (FNV-1a) into a fixed
/// number of buckets, then the vector is L2-normalised. Texts that share
/// vocabulary land close together under cosine distance.
pub struct HashEmbedder {
    dimensions: usize,
    label: String,
}

impl HashEmbedder {
    pub const DEFAULT_DIMENSIONS: usize = 256;

    pub fn new(dimensions: usize) -> Self {
        let dimensions = dimensions.max(1);
        Self {
            dimensions,
            label: format!("hash:{dimensions}"),
        }
    }

    fn fnv1a(bytes: &[u8]) -> u64 {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for b in bytes {
            hash ^= u64::from(*b);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        hash
    }

    /// Synchronous core, shared by the trait impl and tests.
    pub fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let lowered = text.to_lowercase();

        for word in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let idx = (Self::fnv1a(word.as_bytes()) % self.dimensions as u64) as usize;
            vector[idx] += 1.0;
        }

        for pair in lowered.as_bytes().windows(2) {
            let idx = (Self::fnv1a(pair) % self.dimensions as u64) as usize;
            vector[idx] += 0.5;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSIONS)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn name(&self) -> &str {
        &self.label
    }

    fn dimensions(&self) -> Option<usize> {
        Some(self.dimensions)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.vectorize(text))
    }
}
