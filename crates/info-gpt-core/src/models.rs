//! Data types that flow through the ingestion and query pipelines.
//!
//! Documents and chunks only live for the duration of an ingestion run.
//! [`EmbeddingRecord`]s are what the vector store persists; [`ScoredChunk`]s
//! are what it hands back at query time.

use serde::{Deserialize, Serialize};

/// A unit of scraped source content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub content: String,
    /// Where the content came from (page link or blob API URL).
    pub source: String,
    pub title: Option<String>,
}

impl Document {
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// A bounded, overlapping span of a [`Document`]'s content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub source: String,
    pub title: Option<String>,
    /// Position of this chunk within its document, starting at 0.
    pub chunk_index: usize,
    /// Hex SHA-256 of `text`.
    pub hash: String,
}

/// A chunk together with its embedding vector, keyed by an opaque id.
#[derive(Debug, Clone)]
pub struct EmbeddingRecord {
    pub id: String,
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

impl EmbeddingRecord {
    /// Wrap a chunk and its vector under a freshly generated UUID.
    pub fn new(chunk: Chunk, vector: Vec<f32>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            chunk,
            vector,
        }
    }
}

/// A stored chunk returned from a vector store lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredChunk {
    pub id: String,
    pub text: String,
    pub source: String,
    pub title: Option<String>,
    /// Cosine similarity to the query vector. `1.0` for exact metadata lookups.
    pub score: f32,
}

/// Where the answer to a query should be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyTarget {
    /// POST the answer to this URL once it is ready.
    Callback(String),
    /// Return the answer to the caller directly.
    Inline,
}

/// A user question plus routing metadata. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub text: String,
    pub reply_to: ReplyTarget,
}

impl Query {
    pub fn inline(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            reply_to: ReplyTarget::Inline,
        }
    }

    pub fn with_callback(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            reply_to: ReplyTarget::Callback(url.into()),
        }
    }
}
