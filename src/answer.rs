//! Answer generation.
//!
//! Retrieved chunks are "stuffed" into a single prompt as context and the
//! language model answers from them. When retrieval comes back empty the
//! model is not called at all.

use anyhow::Result;
use serde::Serialize;

use info_gpt_core::models::ScoredChunk;

use crate::llm::LanguageModel;
use crate::search::Retriever;
use crate::services::Services;

/// Reply used when nothing relevant is stored.
pub const NO_RESULTS_ANSWER: &str =
    "I couldn't find any relevant documents to answer that question.";

const SEPARATOR_WIDTH: usize = 50;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Answer {
    pub result: String,
    pub source_documents: Vec<ScoredChunk>,
}

impl Answer {
    /// Distinct sources of the retrieved chunks, best first.
    pub fn citations(&self) -> Vec<String> {
        citations(&self.source_documents, self.source_documents.len())
    }

    /// The answer followed by a `Sources:` list, for chat replies.
    pub fn to_reply_text(&self) -> String {
        let cited = self.citations();
        if cited.is_empty() {
            return self.result.clone();
        }
        let mut text = format!("{}\n\nSources:\n", self.result);
        for source in cited {
            text.push_str(&format!("- {}\n", source));
        }
        text
    }
}

/// The prompt for a question and its context chunks.
pub fn build_prompt(question: &str, docs: &[ScoredChunk]) -> String {
    let context = docs
        .iter()
        .map(|d| d.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "Use the following pieces of context to answer the question at the end. \
         If you don't know the answer, just say that you don't know, \
         don't try to make up an answer.\n\n{}\n\nQuestion: {}\nHelpful Answer:",
        context, question
    )
}

/// Retrieve context for `question` and ask the model.
///
/// Retrieval and model errors propagate to the caller.
pub async fn answer(
    retriever: &Retriever,
    model: &dyn LanguageModel,
    question: &str,
) -> Result<Answer> {
    let docs = retriever.retrieve(question).await?;
    if docs.is_empty() {
        tracing::info!("no documents retrieved; skipping model call");
        return Ok(Answer {
            result: NO_RESULTS_ANSWER.to_string(),
            source_documents: docs,
        });
    }

    tracing::debug!(model = model.model_name(), chunks = docs.len(), "asking model");
    let result = model.complete(&build_prompt(question, &docs)).await?;
    Ok(Answer {
        result,
        source_documents: docs,
    })
}

/// Deduplicated sources, in retrieval order, at most `k`.
pub fn citations(docs: &[ScoredChunk], k: usize) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for doc in docs {
        if seen.len() == k {
            break;
        }
        if !seen.contains(&doc.source) {
            seen.push(doc.source.clone());
        }
    }
    seen
}

/// Numbered `content (source)` lines under a header, no model involved.
pub fn format_top_k(docs: &[ScoredChunk]) -> String {
    if docs.is_empty() {
        return NO_RESULTS_ANSWER.to_string();
    }
    let mut text = format!("Here are the top {} relevant results:\n", docs.len());
    for (i, doc) in docs.iter().enumerate() {
        text.push_str(&format!("{}. {} ({})\n", i + 1, doc.text, doc.source));
    }
    text
}

/// Retrieve `k` chunks for `question` and list them.
pub async fn top_k_listing(retriever: &Retriever, question: &str, k: usize) -> Result<String> {
    let docs = retriever.retrieve_k(question, k, None).await?;
    Ok(format_top_k(&docs))
}

/// A separator line, `Source: <url>`, then the text, per document.
pub fn format_sources(docs: &[ScoredChunk]) -> String {
    let separator = "=".repeat(SEPARATOR_WIDTH);
    docs.iter()
        .map(|doc| format!("{}\nSource: {}\n{}\n", separator, doc.source, doc.text))
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn run_ask(services: &Services, question: &str, show_sources: bool) -> Result<()> {
    let model = services.model()?;
    let reply = answer(&services.retriever, model, question).await?;

    println!("{}", reply.result);
    let cited = reply.citations();
    if !cited.is_empty() {
        println!();
        println!("Sources:");
        for source in &cited {
            println!("  - {}", source);
        }
    }
    if show_sources && !reply.source_documents.is_empty() {
        println!();
        print!("{}", format_sources(&reply.source_documents));
    }

    Ok(())
}
