//! RAG pipeline: Retrieval-Augmented Generation with conversation memory.
//!
//! # Flow
//!
//! 1. Resolve the assistant's configuration (unknown → `AssistantNotFound`)
//! 2. Save the user turn and load the recent history
//! 3. Retrieve the `top_k` nearest chunks for the question
//! 4. No chunks → answer with a fixed fallback, skipping generation
//! 5. Otherwise generate from system instruction + history + context
//! 6. Extract sources and confidence, save the assistant turn
//! 7. Summarize the conversation once it is long enough

use std::sync::{Arc, Mutex, MutexGuard};

use ragdesk_core::{
    AssistantCatalog, AssistantConfig, ConversationKey, Error, Message, Provider, ProviderRequest,
};
use ragdesk_memory::VectorStore;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::answer::parse_answer;
use crate::conversation::{ConversationMemory, SummaryOutcome};

/// Answer returned when retrieval finds nothing.
pub const NO_CONTEXT_ANSWER: &str = "Sorry, I couldn't find any information about your question.";

/// Answer returned when the generator fails.
pub const GENERATION_FAILED_ANSWER: &str =
    "Sorry, something went wrong while generating the answer. Please try again later.";

/// Default number of history messages replayed to the generator.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Which branch produced the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOutcome {
    Generated,
    NoContext,
    GenerationFailed,
}

/// The answer to one query, with its structured metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryAnswer {
    pub answer: String,
    pub sources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    pub outcome: AnswerOutcome,
}

impl QueryAnswer {
    fn fixed(answer: &str, outcome: AnswerOutcome) -> Self {
        Self {
            answer: answer.to_string(),
            sources: Vec::new(),
            confidence: None,
            outcome,
        }
    }
}

/// Answers questions for any assistant in the catalog.
#[derive(Clone)]
pub struct RagPipeline {
    catalog: Arc<dyn AssistantCatalog>,
    vectors: VectorStore,
    memory: ConversationMemory,
    provider: Arc<dyn Provider>,
    model: String,
    max_tokens: Option<u32>,
    history_limit: usize,
    background_summarization: bool,
    summaries: Arc<Mutex<JoinSet<()>>>,
}

impl RagPipeline {
    pub fn new(
        catalog: Arc<dyn AssistantCatalog>,
        vectors: VectorStore,
        memory: ConversationMemory,
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            vectors,
            memory,
            provider,
            model: model.into(),
            max_tokens: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
            background_summarization: false,
            summaries: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Run summarization on a spawned task instead of before returning.
    /// Call [`RagPipeline::shutdown`] before exiting so pending summaries
    /// are not lost.
    pub fn with_background_summarization(mut self, enabled: bool) -> Self {
        self.background_summarization = enabled;
        self
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    /// Answer `query` as `assistant` for `user`.
    ///
    /// Generation failures degrade to [`GENERATION_FAILED_ANSWER`]; store
    /// and embedding failures are returned as errors.
    pub async fn process_query(
        &self,
        query: &str,
        assistant: &str,
        user: &str,
    ) -> ragdesk_core::Result<QueryAnswer> {
        let config = self
            .catalog
            .load(assistant)
            .await?
            .ok_or_else(|| Error::AssistantNotFound(assistant.to_string()))?;

        let key = ConversationKey::new(user, assistant);
        let user_turn = Message::user(query);
        let user_turn_id = user_turn.id.clone();
        self.memory.save_message(&key, user_turn).await?;

        let mut history: Vec<Message> = self
            .memory
            .get_history(&key, self.history_limit + 1)
            .await?
            .into_iter()
            .filter(|m| m.id != user_turn_id)
            .collect();
        let excess = history.len().saturating_sub(self.history_limit);
        history.drain(..excess);

        let context = self
            .vectors
            .search(query, assistant, Some(user), config.retriever.top_k)
            .await?;

        info!(
            assistant,
            user,
            history = history.len(),
            chunks = context.len(),
            "Processing query"
        );

        let answer = if context.is_empty() {
            QueryAnswer::fixed(NO_CONTEXT_ANSWER, AnswerOutcome::NoContext)
        } else {
            self.generate(&config, &history, &context, query).await
        };

        self.memory
            .save_message(&key, Message::assistant(answer.answer.clone()))
            .await?;

        self.summarize(key).await;
        Ok(answer)
    }

    async fn generate(
        &self,
        config: &AssistantConfig,
        history: &[Message],
        context: &[String],
        query: &str,
    ) -> QueryAnswer {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(system_instruction(config)));
        messages.extend(history.iter().cloned());
        messages.push(Message::user(user_turn(context, query)));

        let request = ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature: config.generation.temperature,
            max_tokens: self.max_tokens,
        };

        match self.provider.complete(request).await {
            Ok(response) => {
                let parsed = parse_answer(&response.message.content);
                debug!(
                    sources = parsed.sources.len(),
                    confidence = ?parsed.confidence,
                    "Answer generated"
                );
                QueryAnswer {
                    answer: parsed.answer_text,
                    sources: parsed.sources,
                    confidence: parsed.confidence,
                    outcome: AnswerOutcome::Generated,
                }
            }
            Err(e) => {
                warn!(assistant = %config.name, error = %e, "Generation failed");
                QueryAnswer::fixed(GENERATION_FAILED_ANSWER, AnswerOutcome::GenerationFailed)
            }
        }
    }

    /// Summarization never fails the query; errors are logged.
    async fn summarize(&self, key: ConversationKey) {
        let memory = self.memory.clone();
        let task = async move {
            match memory.summarize_dialog(&key).await {
                Ok(SummaryOutcome::Collapsed) => debug!(conversation = %key, "History collapsed"),
                Ok(SummaryOutcome::EmptySummary) => {
                    warn!(conversation = %key, "Summary was empty, history kept")
                }
                Ok(SummaryOutcome::Skipped) => {}
                Err(e) => warn!(conversation = %key, error = %e, "Summarization failed"),
            }
        };

        if self.background_summarization {
            let mut summaries = self.summaries();
            while summaries.try_join_next().is_some() {}
            summaries.spawn(task);
        } else {
            task.await;
        }
    }

    fn summaries(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.summaries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Wait for every background summarization started so far.
    pub async fn shutdown(&self) {
        let mut pending = std::mem::take(&mut *self.summaries());
        if !pending.is_empty() {
            debug!(tasks = pending.len(), "Waiting for background summaries");
        }
        while let Some(joined) = pending.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "Summarization task failed");
            }
        }
    }
}

/// The system instruction for one assistant.
pub fn system_instruction(config: &AssistantConfig) -> String {
    if let Some(prompt) = config
        .generation
        .system_prompt
        .as_deref()
        .filter(|p| !p.trim().is_empty())
    {
        return prompt.to_string();
    }

    format!(
        "You are {persona}. Answer in a {tone} tone.\n\
         Rules:\n\
         - Answer only from the provided context. Do not use outside knowledge.\n\
         - If the context does not fully answer the question, say so and state \
         any assumption you make explicitly.\n\
         - End with a \"Sources:\" block listing the source files you used, one per line.\n\
         - Finish with a line \"Confidence: <number between 0 and 1>\".",
        persona = config.generation.persona,
        tone = config.generation.tone,
    )
}

fn user_turn(context: &[String], query: &str) -> String {
    format!(
        "Context:\n{}\n\nQuestion: {}",
        context.join("\n---\n"),
        query
    )
}
