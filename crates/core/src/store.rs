//! Persistence traits: the relational store the pipeline consumes.
//!
//! A store handle is passed explicitly to every component that needs it;
//! there is no process-wide connection. Implementations: in-memory (tests,
//! ephemeral sessions) and SQLite.

use async_trait::async_trait;
use crate::document::{Chunk, Document, DocumentStatus};
use crate::error::StoreError;
use crate::message::{ConversationKey, Message};

/// Documents and their embedded chunks.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Atomically fetch the document keyed by `(assistant, filename, owner)`,
    /// inserting it with status `uploaded` when absent.
    async fn upsert_document(
        &self,
        assistant: &str,
        filename: &str,
        owner: Option<&str>,
    ) -> Result<Document, StoreError>;

    async fn get_document(&self, id: &str) -> Result<Option<Document>, StoreError>;

    async fn set_document_status(&self, id: &str, status: DocumentStatus) -> Result<(), StoreError>;

    /// Documents of one assistant, optionally restricted to one owner, oldest first.
    async fn list_documents(
        &self,
        assistant: &str,
        owner: Option<&str>,
    ) -> Result<Vec<Document>, StoreError>;

    /// Delete a document and all of its chunks. Returns whether it existed.
    async fn delete_document(&self, id: &str) -> Result<bool, StoreError>;

    /// Persist a batch of chunks all-or-nothing, preserving their order.
    async fn insert_chunks(&self, chunks: Vec<Chunk>) -> Result<(), StoreError>;

    async fn count_document_chunks(&self, document_id: &str) -> Result<usize, StoreError>;

    async fn count_assistant_chunks(&self, assistant: &str) -> Result<usize, StoreError>;

    /// All chunks of an assistant in insertion order.
    ///
    /// With `owner = Some(..)`, only chunks of that owner's documents and of
    /// shared (owner-less) documents are returned.
    async fn scan_chunks(&self, assistant: &str, owner: Option<&str>) -> Result<Vec<Chunk>, StoreError>;
}

/// Append-only conversation turns, keyed by `(user, assistant)`.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn append_message(&self, key: &ConversationKey, message: Message) -> Result<(), StoreError>;

    /// The newest `limit` messages, returned oldest-to-newest.
    async fn recent_messages(&self, key: &ConversationKey, limit: usize) -> Result<Vec<Message>, StoreError>;

    /// Every message of the conversation, oldest-to-newest.
    async fn all_messages(&self, key: &ConversationKey) -> Result<Vec<Message>, StoreError>;

    /// Number of user and assistant messages (system messages excluded).
    async fn count_non_system(&self, key: &ConversationKey) -> Result<usize, StoreError>;

    /// Atomically delete every message of the conversation and insert `replacement`.
    async fn replace_conversation(&self, key: &ConversationKey, replacement: Message) -> Result<(), StoreError>;
}
