//! # ragdesk Core
//!
//! Domain types, traits, and error definitions for the ragdesk
//! retrieval-augmented assistant. This crate has **zero framework
//! dependencies**: it defines the domain model that every other crate
//! implements against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the RAG pipeline is a trait here:
//! - [`Provider`]: text generation (chat completions)
//! - [`Embedder`]: the embedding gateway
//! - [`DocumentStore`] / [`MessageStore`]: the relational store
//! - [`AssistantCatalog`]: per-assistant configuration
//!
//! Implementations live in their respective crates, so a store handle or a
//! provider is always passed in explicitly and can be swapped in tests.

pub mod assistant;
pub mod document;
pub mod embedding;
pub mod error;
pub mod message;
pub mod provider;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use assistant::{AssistantCatalog, AssistantConfig, GenerationSettings, RetrievalSettings};
pub use document::{Chunk, Document, DocumentStatus, ScoredChunk};
pub use embedding::Embedder;
pub use error::{EmbeddingError, Error, ProviderError, Result, StoreError};
pub use message::{ConversationKey, Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
pub use store::{DocumentStore, MessageStore};
