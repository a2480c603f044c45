//! Fakes shared by the integration tests.
#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use axum::Router;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use info_gpt::config::Config;
use info_gpt::llm::LanguageModel;
use info_gpt::services::Services;
use info_gpt_core::embedding::Embedder;
use info_gpt_core::store::memory::InMemoryStore;

/// Bind an axum router to a free local port and return its base URL.
pub async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Bag-of-keywords vectors: one dimension per keyword.
pub struct KeywordEmbedder {
    keywords: Vec<&'static str>,
}

impl KeywordEmbedder {
    pub fn new(keywords: &[&'static str]) -> Self {
        Self {
            keywords: keywords.to_vec(),
        }
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn model_name(&self) -> &str {
        "keywords"
    }

    fn dims(&self) -> usize {
        self.keywords.len() + 1
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let text = text.to_lowercase();
                let mut v: Vec<f32> = self
                    .keywords
                    .iter()
                    .map(|k| text.contains(k) as u8 as f32)
                    .collect();
                // Keeps every vector non-zero.
                v.push(0.01);
                v
            })
            .collect())
    }
}

/// Answers with a fixed string and counts calls.
#[derive(Default)]
pub struct CannedModel {
    pub calls: AtomicUsize,
}

#[async_trait]
impl LanguageModel for CannedModel {
    fn model_name(&self) -> &str {
        "canned"
    }

    async fn complete(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("Ask the platform team in #platform.".to_string())
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.slack.token = Some("s3cret".to_string());
    config.retrieval.k = 3;
    config
}

/// In-memory services with a keyword embedder and a canned model.
pub fn services(config: Config, model: Arc<CannedModel>) -> Services {
    Services::from_parts(
        config,
        Arc::new(KeywordEmbedder::new(&["vpn", "deploy", "billing"])),
        Arc::new(InMemoryStore::new()),
        Some(model as Arc<dyn LanguageModel>),
    )
}
