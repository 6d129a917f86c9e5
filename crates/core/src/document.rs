//! Document and chunk domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle of an ingested document.
///
/// Transitions only move forward (`Uploaded → Processing → Ready`). A failed
/// ingestion leaves the document in `Processing` for operators to inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Uploaded,
    Processing,
    Ready,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Uploaded => "uploaded",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Ready => "ready",
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploaded" => Ok(DocumentStatus::Uploaded),
            "processing" => Ok(DocumentStatus::Processing),
            "ready" => Ok(DocumentStatus::Ready),
            other => Err(format!("unknown document status '{other}'")),
        }
    }
}

/// A source document owned by one assistant scope and optionally one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,

    /// Assistant scope the document belongs to
    pub assistant: String,

    pub filename: String,

    /// Uploading user; `None` for shared documents loaded from disk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    pub status: DocumentStatus,

    pub created_at: DateTime<Utc>,
}

impl Document {
    /// A freshly uploaded document with a new ID.
    pub fn new(assistant: impl Into<String>, filename: impl Into<String>, owner: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            assistant: assistant.into(),
            filename: filename.into(),
            owner,
            status: DocumentStatus::Uploaded,
            created_at: Utc::now(),
        }
    }
}

/// An embedded slice of a document. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub assistant: String,

    /// Chunk text including its trailing source tag
    pub content: String,

    #[serde(skip)]
    pub embedding: Vec<f32>,
}

impl Chunk {
    pub fn new(document: &Document, content: String, embedding: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            document_id: document.id.clone(),
            assistant: document.assistant.clone(),
            content,
            embedding,
        }
    }
}

/// A chunk returned by a similarity search, with its cosine distance.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub distance: f32,
}
