//! Error types for the ragdesk domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error type; [`Error`] is what the
//! pipeline surfaces to callers.

use thiserror::Error;

/// The top-level error type for all ragdesk operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested assistant scope has no configuration record.
    #[error("Assistant not found: {0}")]
    AssistantNotFound(String),

    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Generation failed: {0}")]
    Generation(#[from] ProviderError),

    #[error("Persistence failed: {0}")]
    Persistence(#[from] StoreError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures of the generation capability (and of the HTTP transport behind it).
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures of the embedding gateway. Never retried within the current call.
#[derive(Debug, Clone, Error)]
pub enum EmbeddingError {
    #[error("Embedding provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding provider returned no vector")]
    EmptyResponse,
}

/// Failures of the relational store. Fatal for the current request.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Generation(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn embedding_error_wraps_provider_error() {
        let err: EmbeddingError = ProviderError::Network("connection reset".into()).into();
        let top: Error = err.into();
        assert!(matches!(top, Error::Embedding(EmbeddingError::Provider(_))));
        assert!(top.to_string().contains("connection reset"));
    }

    #[test]
    fn assistant_not_found_names_the_scope() {
        let err = Error::AssistantNotFound("shop".into());
        assert_eq!(err.to_string(), "Assistant not found: shop");
    }
}
