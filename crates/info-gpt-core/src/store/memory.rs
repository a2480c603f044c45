//! In-memory [`VectorStore`] for tests and embedded use.
//!
//! Records live in a `Vec` behind `std::sync::RwLock`. Search is a
//! brute-force cosine scan over records whose vectors have the query's
//! dimension.

use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::{EmbeddingRecord, ScoredChunk};

use super::{top_k, VectorStore};

#[derive(Default)]
pub struct InMemoryStore {
    records: RwLock<Vec<EmbeddingRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn to_scored(record: &EmbeddingRecord, score: f32) -> ScoredChunk {
    ScoredChunk {
        id: record.id.clone(),
        text: record.chunk.text.clone(),
        source: record.chunk.source.clone(),
        title: record.chunk.title.clone(),
        score,
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn insert(&self, records: &[EmbeddingRecord]) -> Result<()> {
        let mut stored = self
            .records
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;
        stored.extend(records.iter().cloned());
        Ok(())
    }

    async fn nearest(
        &self,
        query_vec: &[f32],
        k: usize,
        source: Option<&str>,
    ) -> Result<Vec<ScoredChunk>> {
        let stored = self
            .records
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;
        let candidates = stored
            .iter()
            .filter(|r| r.vector.len() == query_vec.len())
            .filter(|r| source.map_or(true, |s| r.chunk.source == s))
            .map(|r| to_scored(r, cosine_similarity(query_vec, &r.vector)))
            .collect();
        Ok(top_k(candidates, k))
    }

    async fn find_by_source(&self, source: &str) -> Result<Vec<ScoredChunk>> {
        let stored = self
            .records
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;
        Ok(stored
            .iter()
            .filter(|r| r.chunk.source == source)
            .map(|r| to_scored(r, 1.0))
            .collect())
    }

    async fn count(&self) -> Result<usize> {
        let stored = self
            .records
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;
        Ok(stored.len())
    }
}
