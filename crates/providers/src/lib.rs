//! Generation and embedding providers for ragdesk.
//!
//! All generation backends implement `ragdesk_core::Provider`; all embedding
//! gateways implement `ragdesk_core::Embedder`. The router builds the pair
//! selected by configuration.

pub mod embedder;
pub mod openai_compat;
pub mod router;

pub use embedder::{HashEmbedder, ProviderEmbedder};
pub use openai_compat::OpenAiCompatProvider;
pub use router::{build_embedder, build_provider};
