//! The ragdesk agent: retrieval-augmented answering with conversation memory.
//!
//! - [`DocumentIngestor`] splits, embeds and stores documents
//! - [`ConversationMemory`] keeps per-user history and summarizes it
//! - [`parse_answer`] pulls sources and confidence out of generated text
//! - [`RagPipeline`] ties them together behind `process_query`

pub mod answer;
pub mod conversation;
pub mod ingest;
mod locks;
pub mod pipeline;

pub use answer::{ParsedAnswer, parse_answer};
pub use conversation::{ConversationMemory, DEFAULT_SUMMARY_THRESHOLD, SummaryOutcome};
pub use ingest::{DocumentIngestor, IngestFailure, IngestOutcome, ScopeReport};
pub use pipeline::{
    AnswerOutcome, GENERATION_FAILED_ANSWER, NO_CONTEXT_ANSWER, QueryAnswer, RagPipeline,
    system_instruction,
};

#[cfg(test)]
pub(crate) mod test_helpers;
