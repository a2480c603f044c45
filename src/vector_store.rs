//! Embeds chunks on the way in and queries on the way out.
//!
//! [`VectorStoreAdapter`] pairs an [`Embedder`] with a [`VectorStore`] so
//! the rest of the app deals in text, never in raw vectors.

use anyhow::{bail, Result};
use std::sync::Arc;

use info_gpt_core::embedding::Embedder;
use info_gpt_core::models::{Chunk, EmbeddingRecord, ScoredChunk};
use info_gpt_core::store::VectorStore;

pub struct VectorStoreAdapter {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    batch_size: usize,
}

impl VectorStoreAdapter {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        batch_size: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            batch_size: batch_size.max(1),
        }
    }

    /// Embed and persist `chunks`, one embedding call per batch.
    ///
    /// Returns the number of records written. Each chunk gets a fresh id,
    /// so adding the same content twice stores it twice.
    pub async fn add(&self, chunks: &[Chunk]) -> Result<usize> {
        let mut written = 0;

        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embedder.embed(&texts).await?;
            if vectors.len() != batch.len() {
                bail!(
                    "embedder returned {} vectors for {} chunks",
                    vectors.len(),
                    batch.len()
                );
            }

            let records: Vec<EmbeddingRecord> = batch
                .iter()
                .cloned()
                .zip(vectors)
                .map(|(chunk, vector)| EmbeddingRecord::new(chunk, vector))
                .collect();
            self.store.insert(&records).await?;
            written += records.len();
        }

        Ok(written)
    }

    /// The `k` stored chunks closest to `query`, optionally restricted to
    /// one exact source.
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        source: Option<&str>,
    ) -> Result<Vec<ScoredChunk>> {
        let query_vec = self.embedder.embed_query(query).await?;
        self.store.nearest(&query_vec, k, source).await
    }

    pub async fn find_by_source(&self, source: &str) -> Result<Vec<ScoredChunk>> {
        self.store.find_by_source(source).await
    }

    pub async fn count(&self) -> Result<usize> {
        self.store.count().await
    }
}
