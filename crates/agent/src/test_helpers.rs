//! Shared test helpers: scripted providers and embedders.

use async_trait::async_trait;
use ragdesk_core::error::{EmbeddingError, ProviderError, StoreError};
use ragdesk_core::message::{ConversationKey, Message};
use ragdesk_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use ragdesk_core::{Chunk, Document, DocumentStatus, DocumentStore, Embedder, MessageStore};
use ragdesk_memory::InMemoryStore;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue.
/// Panics if more calls are made than responses provided.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    requests: Mutex<Vec<ProviderRequest>>,
    fail: bool,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// Create a provider that returns a single text response.
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![make_text_response(text)])
    }

    /// Create a provider whose every call fails with a network error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(vec![])
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let call = requests.len();
        requests.push(request);

        if self.fail {
            return Err(ProviderError::Network("connection refused".into()));
        }

        let responses = self.responses.lock().unwrap();
        if call >= responses.len() {
            panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                call,
                responses.len()
            );
        }
        Ok(responses[call].clone())
    }
}

/// Create a simple text response.
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// Letter-frequency embedder that counts calls and can be told to fail.
pub struct CountingEmbedder {
    calls: Mutex<usize>,
    fail_from_call: Option<usize>,
}

impl CountingEmbedder {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(0),
            fail_from_call: None,
        }
    }

    /// Fail every call from the `n`-th (0-based) onwards.
    pub fn failing_from(n: usize) -> Self {
        Self {
            calls: Mutex::new(0),
            fail_from_call: Some(n),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    pub fn vectorize(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; 26];
        for c in text.to_ascii_lowercase().bytes().filter(u8::is_ascii_lowercase) {
            v[(c - b'a') as usize] += 1.0;
        }
        v
    }
}

#[async_trait]
impl Embedder for CountingEmbedder {
    fn name(&self) -> &str {
        "counting"
    }

    fn dimensions(&self) -> Option<usize> {
        Some(26)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        // Let concurrent callers interleave, as a remote embedder would.
        tokio::task::yield_now().await;
        let call = {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            *calls - 1
        };
        if self.fail_from_call.is_some_and(|n| call >= n) {
            return Err(ProviderError::Network("embedding endpoint down".into()).into());
        }
        Ok(Self::vectorize(text))
    }
}

/// An [`InMemoryStore`] whose chunk inserts and message appends can be
/// switched to fail.
#[derive(Default)]
pub struct FailingStore {
    inner: InMemoryStore,
    fail_chunk_inserts: AtomicBool,
    fail_appends: AtomicBool,
}

impl FailingStore {
    pub fn failing_chunk_inserts() -> Self {
        let store = Self::default();
        store.fail_chunk_inserts.store(true, Ordering::SeqCst);
        store
    }

    pub fn failing_appends() -> Self {
        let store = Self::default();
        store.fail_appends.store(true, Ordering::SeqCst);
        store
    }

    fn check(flag: &AtomicBool, what: &str) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Storage(format!("{what}: database is locked")));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FailingStore {
    fn name(&self) -> &str {
        "failing"
    }

    async fn upsert_document(
        &self,
        assistant: &str,
        filename: &str,
        owner: Option<&str>,
    ) -> Result<Document, StoreError> {
        self.inner.upsert_document(assistant, filename, owner).await
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>, StoreError> {
        self.inner.get_document(id).await
    }

    async fn set_document_status(&self, id: &str, status: DocumentStatus) -> Result<(), StoreError> {
        self.inner.set_document_status(id, status).await
    }

    async fn list_documents(
        &self,
        assistant: &str,
        owner: Option<&str>,
    ) -> Result<Vec<Document>, StoreError> {
        self.inner.list_documents(assistant, owner).await
    }

    async fn delete_document(&self, id: &str) -> Result<bool, StoreError> {
        self.inner.delete_document(id).await
    }

    async fn insert_chunks(&self, chunks: Vec<Chunk>) -> Result<(), StoreError> {
        Self::check(&self.fail_chunk_inserts, "insert_chunks")?;
        self.inner.insert_chunks(chunks).await
    }

    async fn count_document_chunks(&self, document_id: &str) -> Result<usize, StoreError> {
        self.inner.count_document_chunks(document_id).await
    }

    async fn count_assistant_chunks(&self, assistant: &str) -> Result<usize, StoreError> {
        self.inner.count_assistant_chunks(assistant).await
    }

    async fn scan_chunks(&self, assistant: &str, owner: Option<&str>) -> Result<Vec<Chunk>, StoreError> {
        self.inner.scan_chunks(assistant, owner).await
    }
}

#[async_trait]
impl MessageStore for FailingStore {
    async fn append_message(&self, key: &ConversationKey, message: Message) -> Result<(), StoreError> {
        Self::check(&self.fail_appends, "append_message")?;
        self.inner.append_message(key, message).await
    }

    async fn recent_messages(&self, key: &ConversationKey, limit: usize) -> Result<Vec<Message>, StoreError> {
        self.inner.recent_messages(key, limit).await
    }

    async fn all_messages(&self, key: &ConversationKey) -> Result<Vec<Message>, StoreError> {
        self.inner.all_messages(key).await
    }

    async fn count_non_system(&self, key: &ConversationKey) -> Result<usize, StoreError> {
        self.inner.count_non_system(key).await
    }

    async fn replace_conversation(&self, key: &ConversationKey, replacement: Message) -> Result<(), StoreError> {
        self.inner.replace_conversation(key, replacement).await
    }
}
