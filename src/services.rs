//! Long-lived clients, built once per process and shared by reference.

use anyhow::{Context, Result};
use std::sync::Arc;

use info_gpt_core::embedding::Embedder;
use info_gpt_core::store::VectorStore;

use crate::config::Config;
use crate::db;
use crate::embedding::create_embedder;
use crate::llm::{create_model, LanguageModel};
use crate::migrate;
use crate::search::Retriever;
use crate::sqlite_store::SqliteVectorStore;
use crate::vector_store::VectorStoreAdapter;

pub struct Services {
    pub config: Config,
    pub vectors: Arc<VectorStoreAdapter>,
    pub retriever: Retriever,
    model: Option<Arc<dyn LanguageModel>>,
}

impl Services {
    /// Wire explicit parts together. The retriever uses `retrieval.k`.
    pub fn from_parts(
        config: Config,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        model: Option<Arc<dyn LanguageModel>>,
    ) -> Self {
        let vectors = Arc::new(VectorStoreAdapter::new(
            embedder,
            store,
            config.embedding.batch_size,
        ));
        let retriever = Retriever::new(vectors.clone(), config.retrieval.k);
        Self {
            config,
            vectors,
            retriever,
            model,
        }
    }

    /// Open the SQLite store (creating its schema) and the configured
    /// embedder. No language model is attached.
    pub async fn open(config: Config) -> Result<Self> {
        let embedder = create_embedder(&config.embedding)
            .context("Failed to initialize embedding provider")?;
        let pool = db::connect(&config).await?;
        migrate::apply_schema(&pool).await?;
        let store = Arc::new(SqliteVectorStore::new(
            pool,
            config.db.collection.clone(),
            embedder.model_name().to_string(),
        ));
        Ok(Self::from_parts(config, embedder, store, None))
    }

    /// Like [`open`](Self::open), plus the configured language model.
    pub async fn open_with_model(config: Config) -> Result<Self> {
        let model = create_model(&config.llm).context("Failed to initialize language model")?;
        Ok(Self::open(config).await?.with_model(model))
    }

    pub fn with_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn model(&self) -> Result<&dyn LanguageModel> {
        self.model
            .as_deref()
            .context("no language model configured for this command")
    }
}
