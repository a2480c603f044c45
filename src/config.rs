//! Configuration loading.
//!
//! Settings come from an optional TOML file, then environment variables
//! override individual fields. Every section has defaults, so an empty
//! environment yields a usable (if secret-less) configuration.
//!
//! ```toml
//! [db]
//! directory = ".db"
//! collection = "info_gpt"
//!
//! [chunking]
//! chunk_size = 1000
//! chunk_overlap = 20
//!
//! [embedding]
//! provider = "local"
//! model = "all-minilm-l6-v2"
//!
//! [llm]
//! provider = "openai"
//! model = "gpt-4o-mini"
//! temperature = 0.2
//!
//! [slack]
//! reply_mode = "top_k"
//!
//! [connectors.confluence]
//! base_url = "https://acme.atlassian.net/wiki/"
//! exclude_spaces = ["Archive"]
//!
//! [connectors.github]
//! organization = "acme"
//! extension = ".md"
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Field |
//! |----------|-------|
//! | `DB_DIRECTORY` | `db.directory` |
//! | `DB_COLLECTION_NAME` | `db.collection` |
//! | `MODEL_TYPE` | `llm.provider` |
//! | `MODEL_PATH` | `llm.model` |
//! | `MODEL_N_CTX` | `llm.n_ctx` |
//! | `TEMPERATURE` | `llm.temperature` |
//! | `EMBEDDING_PROVIDER` | `embedding.provider` |
//! | `EMBEDDING_MODEL_NAME` | `embedding.model` |
//! | `CHUNK_SIZE` / `CHUNK_OVERLAP` | `chunking.*` |
//! | `BIND_ADDR` | `server.bind` |
//! | `SLACK_TOKEN` | `slack.token` |
//! | `GITHUB_TOKEN` | `connectors.github.token` |
//! | `CONFLUENCE_DOMAIN` | `connectors.confluence.base_url` |
//! | `CONFLUENCE_USERNAME` / `CONFLUENCE_PASSWORD` | `connectors.confluence.*` |
//!
//! `OPENAI_API_KEY` is read by the OpenAI providers when they are built.

use anyhow::{bail, Context, Result};
use info_gpt_core::chunk::ChunkConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// File name of the SQLite vector store inside `db.directory`.
pub const DB_FILE_NAME: &str = "info-gpt.sqlite";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub db: DbConfig,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub retrieval: RetrievalConfig,
    pub server: ServerConfig,
    pub slack: SlackConfig,
    pub tasks: TasksConfig,
    pub connectors: ConnectorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DbConfig {
    pub directory: PathBuf,
    pub collection: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(".db"),
            collection: "info_gpt".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 20,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `local`, `openai`, or `ollama`.
    pub provider: String,
    pub model: Option<String>,
    pub dims: Option<usize>,
    /// Base URL for the Ollama provider.
    pub url: Option<String>,
    pub batch_size: usize,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "local".to_string(),
            model: Some("all-minilm-l6-v2".to_string()),
            dims: None,
            url: None,
            batch_size: 64,
            max_retries: 5,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    /// `openai` or `ollama`.
    pub provider: String,
    pub model: String,
    pub temperature: f32,
    /// Context window hint passed to local models.
    pub n_ctx: usize,
    /// Base URL for the Ollama provider.
    pub url: Option<String>,
    /// No timeout when unset.
    pub timeout_secs: Option<u64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            n_ctx: 2048,
            url: None,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks retrieved per query.
    pub k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { k: 3 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
        }
    }
}

/// What a Slack command gets back once its job completes.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReplyMode {
    /// A numbered list of the top-k matching chunks.
    #[default]
    TopK,
    /// A model-generated answer with citations.
    Answer,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SlackConfig {
    pub token: Option<String>,
    pub reply_mode: ReplyMode,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TasksConfig {
    pub workers: usize,
    pub queue_capacity: usize,
    pub delivery_timeout_secs: u64,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 256,
            delivery_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ConnectorsConfig {
    pub confluence: ConfluenceConfig,
    pub github: GithubConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ConfluenceConfig {
    /// `https://{org}.atlassian.net/wiki/`
    pub base_url: Option<String>,
    pub username: Option<String>,
    /// API token from id.atlassian.com.
    pub password: Option<String>,
    /// Space names to skip.
    pub exclude_spaces: Vec<String>,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ConfluenceConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            username: None,
            password: None,
            exclude_spaces: Vec::new(),
            chunk_size: 600,
            chunk_overlap: 20,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GithubConfig {
    pub api_url: String,
    pub token: Option<String>,
    pub organization: Option<String>,
    /// Only files whose path ends with this suffix are ingested.
    pub extension: String,
    /// Case-insensitive substrings; matching paths are skipped.
    pub exclude_patterns: Vec<String>,
    pub max_concurrent_fetches: usize,
    /// Falls back to `[chunking]` when unset.
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            token: None,
            organization: None,
            extension: ".md".to_string(),
            exclude_patterns: default_exclude_patterns(),
            max_concurrent_fetches: 8,
            chunk_size: None,
            chunk_overlap: None,
        }
    }
}

pub fn default_exclude_patterns() -> Vec<String> {
    [
        ".github",
        "license.md",
        "contributing.md",
        "pull_request_template.md",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Confluence credentials, all present.
#[derive(Debug, Clone)]
pub struct ConfluenceCredentials {
    pub base_url: String,
    pub username: String,
    pub password: String,
}

impl Config {
    /// Path of the SQLite vector store file.
    pub fn db_path(&self) -> PathBuf {
        self.db.directory.join(DB_FILE_NAME)
    }

    pub fn chunk_config(&self) -> Result<ChunkConfig> {
        ChunkConfig::new(self.chunking.chunk_size, self.chunking.chunk_overlap)
            .context("invalid [chunking] settings")
    }

    pub fn confluence_chunk_config(&self) -> Result<ChunkConfig> {
        let c = &self.connectors.confluence;
        ChunkConfig::new(c.chunk_size, c.chunk_overlap)
            .context("invalid [connectors.confluence] chunk settings")
    }

    pub fn github_chunk_config(&self) -> Result<ChunkConfig> {
        let g = &self.connectors.github;
        ChunkConfig::new(
            g.chunk_size.unwrap_or(self.chunking.chunk_size),
            g.chunk_overlap.unwrap_or(self.chunking.chunk_overlap),
        )
        .context("invalid [connectors.github] chunk settings")
    }

    /// The shared Slack secret. Required by `serve`.
    pub fn require_slack_token(&self) -> Result<&str> {
        non_empty(self.slack.token.as_deref())
            .context("SLACK_TOKEN is not set (slack.token); refusing to start the API")
    }

    pub fn require_github_token(&self) -> Result<&str> {
        non_empty(self.connectors.github.token.as_deref())
            .context("GITHUB_TOKEN is not set (connectors.github.token)")
    }

    pub fn require_confluence(&self) -> Result<ConfluenceCredentials> {
        let c = &self.connectors.confluence;
        let base_url = non_empty(c.base_url.as_deref())
            .context("CONFLUENCE_DOMAIN is not set (connectors.confluence.base_url)")?;
        let username = non_empty(c.username.as_deref())
            .context("CONFLUENCE_USERNAME is not set (connectors.confluence.username)")?;
        let password = non_empty(c.password.as_deref())
            .context("CONFLUENCE_PASSWORD is not set (connectors.confluence.password)")?;
        Ok(ConfluenceCredentials {
            base_url: base_url.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    /// Override fields from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Override fields from an arbitrary variable lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("DB_DIRECTORY") {
            self.db.directory = PathBuf::from(v);
        }
        if let Some(v) = get("DB_COLLECTION_NAME") {
            self.db.collection = v;
        }
        if let Some(v) = get("MODEL_TYPE") {
            self.llm.provider = v.to_lowercase();
        }
        if let Some(v) = get("MODEL_PATH") {
            self.llm.model = v;
        }
        if let Some(v) = get("MODEL_N_CTX") {
            self.llm.n_ctx = parse_var("MODEL_N_CTX", &v)?;
        }
        if let Some(v) = get("TEMPERATURE") {
            self.llm.temperature = parse_var("TEMPERATURE", &v)?;
        }
        if let Some(v) = get("EMBEDDING_PROVIDER") {
            self.embedding.provider = v.to_lowercase();
        }
        if let Some(v) = get("EMBEDDING_MODEL_NAME") {
            self.embedding.model = Some(v);
        }
        if let Some(v) = get("CHUNK_SIZE") {
            self.chunking.chunk_size = parse_var("CHUNK_SIZE", &v)?;
        }
        if let Some(v) = get("CHUNK_OVERLAP") {
            self.chunking.chunk_overlap = parse_var("CHUNK_OVERLAP", &v)?;
        }
        if let Some(v) = get("BIND_ADDR") {
            self.server.bind = v;
        }
        if let Some(v) = get("SLACK_TOKEN") {
            self.slack.token = Some(v);
        }
        if let Some(v) = get("GITHUB_TOKEN") {
            self.connectors.github.token = Some(v);
        }
        if let Some(v) = get("CONFLUENCE_DOMAIN") {
            self.connectors.confluence.base_url = Some(v);
        }
        if let Some(v) = get("CONFLUENCE_USERNAME") {
            self.connectors.confluence.username = Some(v);
        }
        if let Some(v) = get("CONFLUENCE_PASSWORD") {
            self.connectors.confluence.password = Some(v);
        }
        Ok(())
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        self.chunk_config()?;
        self.confluence_chunk_config()?;
        self.github_chunk_config()?;

        if self.retrieval.k == 0 {
            bail!("retrieval.k must be >= 1");
        }
        if self.tasks.workers == 0 {
            bail!("tasks.workers must be >= 1");
        }
        if self.tasks.queue_capacity == 0 {
            bail!("tasks.queue_capacity must be >= 1");
        }
        if self.connectors.github.max_concurrent_fetches == 0 {
            bail!("connectors.github.max_concurrent_fetches must be >= 1");
        }
        if self.embedding.batch_size == 0 {
            bail!("embedding.batch_size must be >= 1");
        }

        match self.embedding.provider.as_str() {
            "local" | "openai" | "ollama" => {}
            other => bail!(
                "Unknown embedding provider: '{}'. Must be local, openai, or ollama.",
                other
            ),
        }
        if matches!(self.embedding.provider.as_str(), "openai" | "ollama")
            && (self.embedding.model.is_none() || self.embedding.dims.unwrap_or(0) == 0)
        {
            bail!(
                "embedding.model and embedding.dims must be set when provider is '{}'",
                self.embedding.provider
            );
        }

        match self.llm.provider.as_str() {
            "openai" | "ollama" => {}
            other => bail!(
                "Unknown model type: '{}'. Must be openai or ollama.",
                other
            ),
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            bail!("llm.temperature must be in [0.0, 2.0]");
        }

        Ok(())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse::<T>()
        .with_context(|| format!("{} has an invalid value: '{}'", key, value))
}

/// Read the TOML file (if any), apply environment overrides, validate.
///
/// With no explicit path, `./config/info-gpt.toml` is used when present;
/// otherwise defaults apply. An explicit path that cannot be read is an error.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = read_config_file(path)?;
    config.apply_env()?;
    config.validate()?;
    Ok(config)
}

fn read_config_file(path: Option<&Path>) -> Result<Config> {
    let default_path = Path::new("./config/info-gpt.toml");
    let path = match path {
        Some(p) => p,
        None if default_path.exists() => default_path,
        None => return Ok(Config::default()),
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content).with_context(|| "Failed to parse config file")
}
