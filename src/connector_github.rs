//! GitHub organization connector.
//!
//! Walks every non-archived repository of an organization, lists the files
//! on its default branch through the git trees API, and downloads the ones
//! matching a file extension as blobs.
//!
//! Failure handling is split by level:
//!
//! | Stage | Outcome |
//! |-------|---------|
//! | repository listing | [`ScrapeError`], the caller stops |
//! | tree listing | [`RepoScrapeError::Tree`], the repository is skipped |
//! | any file download | [`RepoScrapeError::File`], the whole repository batch is dropped |

use std::sync::Arc;

use base64::Engine;
use serde::Deserialize;
use tokio::sync::Semaphore;

use info_gpt_core::models::Document;

use crate::config::GithubConfig;
use crate::scrape::{fetch_json, scrape_client, ScrapeError};

const PER_PAGE: u32 = 100;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Repository {
    pub name: String,
    pub default_branch: String,
    #[serde(default)]
    pub archived: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Blob API URL. Absent for some entry kinds.
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Tree {
    #[serde(default)]
    tree: Vec<TreeEntry>,
}

#[derive(Debug, Deserialize)]
struct Blob {
    size: u64,
    url: String,
    content: String,
}

/// A decoded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    pub content: String,
    pub url: String,
    pub size: u64,
}

/// Why a single repository produced no batch.
#[derive(Debug, thiserror::Error)]
pub enum RepoScrapeError {
    #[error("failed to list files in {repo}: {source}")]
    Tree { repo: String, source: ScrapeError },

    #[error("failed to read {path} in {repo}: {source}")]
    File {
        repo: String,
        path: String,
        source: ScrapeError,
    },
}

/// True when `path` contains any of `patterns`, ignoring case.
pub fn is_excluded(path: &str, patterns: &[String]) -> bool {
    let path = path.to_lowercase();
    patterns
        .iter()
        .any(|pattern| path.contains(&pattern.to_lowercase()))
}

/// Decode GitHub's base64 blob content, which is wrapped with newlines.
pub fn decode_content(encoded: &str) -> Result<String, ScrapeError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| ScrapeError::Decode(format!("invalid base64 content: {}", e)))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub struct GithubClient {
    api_url: String,
    organization: String,
    token: String,
    extension: String,
    exclude_patterns: Vec<String>,
    fetch_slots: Arc<Semaphore>,
    client: reqwest::Client,
}

impl GithubClient {
    pub fn new(
        config: &GithubConfig,
        organization: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, ScrapeError> {
        Ok(Self {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            organization: organization.into(),
            token: token.into(),
            extension: config.extension.clone(),
            exclude_patterns: config.exclude_patterns.clone(),
            fetch_slots: Arc::new(Semaphore::new(config.max_concurrent_fetches)),
            client: scrape_client()?,
        })
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    fn get(&self, url: &str, accept: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header(reqwest::header::ACCEPT, accept)
            .header(reqwest::header::USER_AGENT, "info-gpt")
            .bearer_auth(&self.token)
    }

    /// One page (1-based) of the organization's repositories, archived
    /// ones included. An empty page means there are no more.
    pub async fn list_repositories(&self, page: u32) -> Result<Vec<Repository>, ScrapeError> {
        let url = format!("{}/orgs/{}/repos", self.api_url, self.organization);
        let request = self
            .get(&url, "application/vnd.github.v3+json")
            .query(&[("per_page", PER_PAGE), ("page", page)]);
        fetch_json(request).await
    }

    /// Blob entries on the repository's default branch that match the
    /// configured extension and are not excluded.
    pub async fn list_files(&self, repo: &Repository) -> Result<Vec<TreeEntry>, ScrapeError> {
        let url = format!(
            "{}/repos/{}/{}/git/trees/{}",
            self.api_url, self.organization, repo.name, repo.default_branch
        );
        let request = self
            .get(&url, "application/vnd.github+json")
            .query(&[("recursive", "1")]);
        let tree: Tree = fetch_json(request).await?;

        Ok(tree
            .tree
            .into_iter()
            .filter(|entry| entry.kind == "blob" && entry.url.is_some())
            .filter(|entry| entry.path.ends_with(&self.extension))
            .filter(|entry| !is_excluded(&entry.path, &self.exclude_patterns))
            .collect())
    }

    /// Download and decode a blob.
    pub async fn read_file(&self, url: &str) -> Result<FileContent, ScrapeError> {
        let blob: Blob = fetch_json(self.get(url, "application/vnd.github+json")).await?;
        Ok(FileContent {
            content: decode_content(&blob.content)?,
            url: blob.url,
            size: blob.size,
        })
    }

    /// All matching files of one repository as documents.
    ///
    /// Downloads run concurrently, bounded by `max_concurrent_fetches`
    /// across the whole client. One failed download fails the batch.
    pub async fn scrape_repository(
        &self,
        repo: &Repository,
    ) -> Result<Vec<Document>, RepoScrapeError> {
        let files = self
            .list_files(repo)
            .await
            .map_err(|source| RepoScrapeError::Tree {
                repo: repo.name.clone(),
                source,
            })?;
        tracing::info!(
            repo = %repo.name,
            files = files.len(),
            extension = %self.extension,
            "listed repository files"
        );

        let fetches = files.iter().map(|entry| async move {
            let url = entry.url.as_deref().unwrap_or_default();
            let result = match self.fetch_slots.acquire().await {
                Ok(_permit) => self.read_file(url).await,
                Err(e) => Err(ScrapeError::Http(e.to_string())),
            };
            (entry, result)
        });

        let mut documents = Vec::with_capacity(files.len());
        for (entry, result) in futures::future::join_all(fetches).await {
            let file = result.map_err(|source| RepoScrapeError::File {
                repo: repo.name.clone(),
                path: entry.path.clone(),
                source,
            })?;
            documents.push(
                Document::new(file.content, file.url)
                    .with_title(format!("{}/{}", repo.name, entry.path)),
            );
        }

        Ok(documents)
    }
}
