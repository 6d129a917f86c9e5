//! Conversation memory: history windowing and summarization.
//!
//! Every turn is appended to the [`MessageStore`]. Once a conversation holds
//! `threshold` user/assistant messages, the whole transcript is condensed by
//! the provider into one system message that replaces it.
//!
//! Saves and summarization for the same [`ConversationKey`] are serialized
//! through a per-key async mutex, so a summary never swallows a turn that
//! was written while it was being generated.

use std::sync::Arc;

use ragdesk_core::message::{ConversationKey, Message, Role};
use ragdesk_core::provider::{Provider, ProviderRequest};
use ragdesk_core::store::MessageStore;
use tracing::{debug, info};

use crate::locks::KeyedLocks;

/// Default number of non-system messages that triggers summarization.
pub const DEFAULT_SUMMARY_THRESHOLD: usize = 20;

/// What a call to [`ConversationMemory::summarize_dialog`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryOutcome {
    /// Below the threshold; nothing changed.
    Skipped,
    /// The conversation now consists of a single system summary.
    Collapsed,
    /// The provider returned nothing usable; the conversation is untouched.
    EmptySummary,
}

#[derive(Clone)]
pub struct ConversationMemory {
    store: Arc<dyn MessageStore>,
    provider: Arc<dyn Provider>,
    model: String,
    threshold: usize,
    locks: KeyedLocks<ConversationKey>,
}

impl ConversationMemory {
    pub fn new(
        store: Arc<dyn MessageStore>,
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            store,
            provider,
            model: model.into(),
            threshold: DEFAULT_SUMMARY_THRESHOLD,
            locks: KeyedLocks::default(),
        }
    }

    /// Set the summarization threshold.
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold.max(1);
        self
    }

    /// Append one turn to the conversation.
    pub async fn save_message(
        &self,
        key: &ConversationKey,
        message: Message,
    ) -> ragdesk_core::Result<()> {
        let _guard = self.locks.lock(key).await;
        debug!(conversation = %key, role = %message.role, "Saving message");
        self.store.append_message(key, message).await?;
        Ok(())
    }

    /// The most recent `limit` messages, oldest first.
    pub async fn get_history(
        &self,
        key: &ConversationKey,
        limit: usize,
    ) -> ragdesk_core::Result<Vec<Message>> {
        Ok(self.store.recent_messages(key, limit).await?)
    }

    /// Collapse the conversation into a single system summary once it has
    /// reached the threshold.
    pub async fn summarize_dialog(&self, key: &ConversationKey) -> ragdesk_core::Result<SummaryOutcome> {
        let _guard = self.locks.lock(key).await;

        let count = self.store.count_non_system(key).await?;
        if count < self.threshold {
            return Ok(SummaryOutcome::Skipped);
        }

        let messages = self.store.all_messages(key).await?;
        let previous_summary = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let request = ProviderRequest {
            model: self.model.clone(),
            messages: vec![
                Message::system(
                    "You condense support conversations. Reply with the summary only.",
                ),
                Message::user(build_summary_prompt(&previous_summary, &messages)),
            ],
            temperature: 0.2,
            max_tokens: Some(512),
        };

        let response = self.provider.complete(request).await?;
        let summary = response.message.content.trim();
        if summary.is_empty() {
            return Ok(SummaryOutcome::EmptySummary);
        }

        self.store
            .replace_conversation(key, Message::system(summary))
            .await?;

        info!(conversation = %key, messages = count, "Conversation summarized");
        Ok(SummaryOutcome::Collapsed)
    }
}

/// Transcript of the non-system turns, with any earlier summary up front.
fn build_summary_prompt(previous_summary: &str, messages: &[Message]) -> String {
    let transcript = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n");

    let mut prompt = String::from(
        "Summarise the following conversation concisely, preserving all \
         important facts, questions, and answers. Write in third person.\n\n",
    );
    if !previous_summary.is_empty() {
        prompt.push_str("Earlier summary:\n");
        prompt.push_str(previous_summary);
        prompt.push_str("\n\n");
    }
    prompt.push_str("---\n");
    prompt.push_str(&transcript);
    prompt.push_str("\n---");
    prompt
}
