//! Vector store abstraction.
//!
//! The [`VectorStore`] trait is the only piece of state shared between the
//! ingestion path and the query path. Implementations must be
//! `Send + Sync`; callers add no locking of their own.
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`insert`](VectorStore::insert) | Persist embedding records |
//! | [`nearest`](VectorStore::nearest) | Top-k cosine similarity search |
//! | [`find_by_source`](VectorStore::find_by_source) | Exact metadata lookup |
//! | [`count`](VectorStore::count) | Number of stored records |
//!
//! Inserts are not idempotent: every record carries a fresh id, so
//! re-ingesting the same content stores it twice.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{EmbeddingRecord, ScoredChunk};

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Persist records as-is, keyed by their ids.
    async fn insert(&self, records: &[EmbeddingRecord]) -> Result<()>;

    /// Return up to `k` records ordered by descending cosine similarity.
    ///
    /// Only records whose vector has the query's dimension are candidates;
    /// implementations that know the embedding model also skip records
    /// written by a different one. When `source` is set, only records whose
    /// source matches exactly are considered.
    async fn nearest(
        &self,
        query_vec: &[f32],
        k: usize,
        source: Option<&str>,
    ) -> Result<Vec<ScoredChunk>>;

    /// All records whose source matches exactly, in insertion order.
    async fn find_by_source(&self, source: &str) -> Result<Vec<ScoredChunk>>;

    async fn count(&self) -> Result<usize>;
}

/// Sort candidates by descending score and keep the best `k`.
pub fn top_k(mut candidates: Vec<ScoredChunk>, k: usize) -> Vec<ScoredChunk> {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    candidates.truncate(k);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(id: &str, score: f32) -> ScoredChunk {
        ScoredChunk {
            id: id.to_string(),
            text: String::new(),
            source: String::new(),
            title: None,
            score,
        }
    }

    #[test]
    fn test_top_k_orders_and_truncates() {
        let out = top_k(
            vec![scored("a", 0.1), scored("b", 0.9), scored("c", 0.5)],
            2,
        );
        let ids: Vec<&str> = out.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn test_top_k_handles_nan() {
        let out = top_k(vec![scored("a", f32::NAN), scored("b", 0.2)], 5);
        assert_eq!(out.len(), 2);
    }
}
