//! Document storage, chunking and vector search for ragdesk.
//!
//! Backends:
//! - `InMemoryStore`: process memory, for tests and ephemeral sessions
//! - `SqliteStore`: a single SQLite file (default)
//!
//! Both implement `DocumentStore` and `MessageStore` from `ragdesk-core`.
//! `TextSplitter` cuts documents into chunks; `VectorStore` ranks stored
//! chunks against a query by cosine distance.

pub mod chunker;
pub mod in_memory;
pub mod sqlite;
pub mod vector;

pub use chunker::{Chunks, SplitterError, TextSplitter};
pub use in_memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use vector::{VectorStore, cosine_distance, cosine_similarity};
