use anyhow::Result;
use std::sync::Arc;

use info_gpt_core::models::ScoredChunk;

use crate::services::Services;
use crate::vector_store::VectorStoreAdapter;

/// Top-k semantic retrieval over the vector store.
#[derive(Clone)]
pub struct Retriever {
    vectors: Arc<VectorStoreAdapter>,
    k: usize,
}

impl Retriever {
    pub fn new(vectors: Arc<VectorStoreAdapter>, k: usize) -> Self {
        Self { vectors, k }
    }

    /// Default number of chunks per query.
    pub fn k(&self) -> usize {
        self.k
    }

    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredChunk>> {
        self.retrieve_k(query, self.k, None).await
    }

    /// Up to `k` chunks, best first. A blank query matches nothing.
    pub async fn retrieve_k(
        &self,
        query: &str,
        k: usize,
        source: Option<&str>,
    ) -> Result<Vec<ScoredChunk>> {
        if query.trim().is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        self.vectors.search(query, k, source).await
    }
}

pub async fn run_search(
    services: &Services,
    query: &str,
    limit: Option<usize>,
    source_filter: Option<String>,
) -> Result<()> {
    let k = limit.unwrap_or_else(|| services.retriever.k());
    let results = services
        .retriever
        .retrieve_k(query, k, source_filter.as_deref())
        .await?;

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        let title_display = result.title.as_deref().unwrap_or("(untitled)");
        println!("{}. [{:.2}] {}", i + 1, result.score, title_display);
        println!("    source: {}", result.source);
        println!("    excerpt: \"{}\"", excerpt(&result.text, 240));
        println!();
    }

    Ok(())
}

/// First `max_chars` characters of `text` on one line.
fn excerpt(text: &str, max_chars: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{}...", cut)
}
