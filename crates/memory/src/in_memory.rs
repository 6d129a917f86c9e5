//! In-memory store: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use ragdesk_core::document::{Chunk, Document, DocumentStatus};
use ragdesk_core::error::StoreError;
use ragdesk_core::message::{ConversationKey, Message, Role};
use ragdesk_core::store::{DocumentStore, MessageStore};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    documents: Vec<Document>,
    chunks: Vec<Chunk>,
    conversations: HashMap<ConversationKey, Vec<Message>>,
}

/// Documents, chunks and conversations kept in process memory.
/// Useful for testing and sessions where persistence isn't needed.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn owner_visible(doc_owner: Option<&str>, filter: Option<&str>) -> bool {
    match (filter, doc_owner) {
        (None, _) => true,
        (Some(_), None) => true,
        (Some(wanted), Some(actual)) => wanted == actual,
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn upsert_document(
        &self,
        assistant: &str,
        filename: &str,
        owner: Option<&str>,
    ) -> Result<Document, StoreError> {
        let mut state = self.state.write().await;
        if let Some(existing) = state.documents.iter().find(|d| {
            d.assistant == assistant && d.filename == filename && d.owner.as_deref() == owner
        }) {
            return Ok(existing.clone());
        }

        let doc = Document::new(assistant, filename, owner.map(str::to_string));
        state.documents.push(doc.clone());
        Ok(doc)
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>, StoreError> {
        let state = self.state.read().await;
        Ok(state.documents.iter().find(|d| d.id == id).cloned())
    }

    async fn set_document_status(&self, id: &str, status: DocumentStatus) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let doc = state
            .documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("document {id}")))?;
        doc.status = status;
        Ok(())
    }

    async fn list_documents(
        &self,
        assistant: &str,
        owner: Option<&str>,
    ) -> Result<Vec<Document>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .documents
            .iter()
            .filter(|d| d.assistant == assistant)
            .filter(|d| owner.is_none() || d.owner.as_deref() == owner)
            .cloned()
            .collect())
    }

    async fn delete_document(&self, id: &str) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        let before = state.documents.len();
        state.documents.retain(|d| d.id != id);
        let removed = state.documents.len() < before;
        if removed {
            state.chunks.retain(|c| c.document_id != id);
        }
        Ok(removed)
    }

    async fn insert_chunks(&self, chunks: Vec<Chunk>) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if let Some(orphan) = chunks
            .iter()
            .find(|c| !state.documents.iter().any(|d| d.id == c.document_id))
        {
            return Err(StoreError::NotFound(format!("document {}", orphan.document_id)));
        }
        state.chunks.extend(chunks);
        Ok(())
    }

    async fn count_document_chunks(&self, document_id: &str) -> Result<usize, StoreError> {
        let state = self.state.read().await;
        Ok(state.chunks.iter().filter(|c| c.document_id == document_id).count())
    }

    async fn count_assistant_chunks(&self, assistant: &str) -> Result<usize, StoreError> {
        let state = self.state.read().await;
        Ok(state.chunks.iter().filter(|c| c.assistant == assistant).count())
    }

    async fn scan_chunks(&self, assistant: &str, owner: Option<&str>) -> Result<Vec<Chunk>, StoreError> {
        let state = self.state.read().await;
        let owners: HashMap<&str, Option<&str>> = state
            .documents
            .iter()
            .map(|d| (d.id.as_str(), d.owner.as_deref()))
            .collect();

        Ok(state
            .chunks
            .iter()
            .filter(|c| c.assistant == assistant)
            .filter(|c| {
                owners
                    .get(c.document_id.as_str())
                    .is_some_and(|doc_owner| owner_visible(*doc_owner, owner))
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    async fn append_message(&self, key: &ConversationKey, message: Message) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.conversations.entry(key.clone()).or_default().push(message);
        Ok(())
    }

    async fn recent_messages(&self, key: &ConversationKey, limit: usize) -> Result<Vec<Message>, StoreError> {
        let state = self.state.read().await;
        let all = state.conversations.get(key).map(Vec::as_slice).unwrap_or_default();
        let skip = all.len().saturating_sub(limit);
        Ok(all[skip..].to_vec())
    }

    async fn all_messages(&self, key: &ConversationKey) -> Result<Vec<Message>, StoreError> {
        let state = self.state.read().await;
        Ok(state.conversations.get(key).cloned().unwrap_or_default())
    }

    async fn count_non_system(&self, key: &ConversationKey) -> Result<usize, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .conversations
            .get(key)
            .map(|msgs| msgs.iter().filter(|m| m.role != Role::System).count())
            .unwrap_or(0))
    }

    async fn replace_conversation(&self, key: &ConversationKey, replacement: Message) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.conversations.insert(key.clone(), vec![replacement]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_is_idempotent_per_owner() {
        let store = InMemoryStore::new();
        let a = store.upsert_document("shop", "faq.txt", None).await.unwrap();
        let b = store.upsert_document("shop", "faq.txt", None).await.unwrap();
        let c = store.upsert_document("shop", "faq.txt", Some("42")).await.unwrap();
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
        assert_eq!(store.list_documents("shop", None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn scan_respects_owner_visibility() {
        let store = InMemoryStore::new();
        let shared = store.upsert_document("shop", "faq.txt", None).await.unwrap();
        let mine = store.upsert_document("shop", "mine.txt", Some("1")).await.unwrap();
        let theirs = store.upsert_document("shop", "theirs.txt", Some("2")).await.unwrap();
        store
            .insert_chunks(vec![
                Chunk::new(&shared, "shared".into(), vec![1.0]),
                Chunk::new(&mine, "mine".into(), vec![1.0]),
                Chunk::new(&theirs, "theirs".into(), vec![1.0]),
            ])
            .await
            .unwrap();

        let seen: Vec<String> = store
            .scan_chunks("shop", Some("1"))
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.content)
            .collect();
        assert_eq!(seen, vec!["shared", "mine"]);
        assert_eq!(store.scan_chunks("shop", None).await.unwrap().len(), 3);
        assert!(store.scan_chunks("other", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn chunk_batch_for_unknown_document_is_rejected() {
        let store = InMemoryStore::new();
        let ghost = Document::new("shop", "ghost.txt", None);
        let doc = store.upsert_document("shop", "faq.txt", None).await.unwrap();
        let err = store
            .insert_chunks(vec![
                Chunk::new(&doc, "ok".into(), vec![1.0]),
                Chunk::new(&ghost, "orphan".into(), vec![1.0]),
            ])
            .await;
        assert!(err.is_err());
        assert_eq!(store.count_assistant_chunks("shop").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_cascades_to_chunks() {
        let store = InMemoryStore::new();
        let doc = store.upsert_document("shop", "faq.txt", None).await.unwrap();
        store
            .insert_chunks(vec![Chunk::new(&doc, "a".into(), vec![1.0])])
            .await
            .unwrap();
        assert!(store.delete_document(&doc.id).await.unwrap());
        assert!(!store.delete_document(&doc.id).await.unwrap());
        assert_eq!(store.count_document_chunks(&doc.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn recent_messages_window() {
        let store = InMemoryStore::new();
        let key = ConversationKey::new("u1", "shop");
        for i in 0..5 {
            store.append_message(&key, Message::user(format!("m{i}"))).await.unwrap();
        }
        let recent = store.recent_messages(&key, 2).await.unwrap();
        let texts: Vec<_> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(texts, vec!["m3", "m4"]);
        assert_eq!(store.recent_messages(&key, 50).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn replace_conversation_leaves_single_message() {
        let store = InMemoryStore::new();
        let key = ConversationKey::new("u1", "shop");
        store.append_message(&key, Message::user("q")).await.unwrap();
        store.append_message(&key, Message::assistant("a")).await.unwrap();
        assert_eq!(store.count_non_system(&key).await.unwrap(), 2);

        store.replace_conversation(&key, Message::system("summary")).await.unwrap();
        let all = store.all_messages(&key).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].role, Role::System);
        assert_eq!(store.count_non_system(&key).await.unwrap(), 0);
    }
}
