//! Ingestion pipeline orchestration.
//!
//! Coordinates the offline flow: scraper → chunker → embedder → store.
//! Confluence is ingested one space at a time and GitHub one repository at
//! a time, so a failing unit is counted and skipped while the rest of the
//! run continues. Listing failures (spaces, repository pages) end the run.

use anyhow::{Context, Result};

use info_gpt_core::chunk::{chunk_documents, ChunkConfig};
use info_gpt_core::models::Document;

use crate::connector_confluence::ConfluenceClient;
use crate::connector_github::{GithubClient, RepoScrapeError};
use crate::services::Services;
use crate::vector_store::VectorStoreAdapter;

/// Counts for one sync run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestReport {
    /// Spaces or repositories that produced documents.
    pub scraped: usize,
    /// Units whose scrape or store write failed.
    pub failed: usize,
    /// Units skipped (repository tree unavailable, archived, or no matches).
    pub skipped: usize,
    pub documents: usize,
    pub chunks: usize,
    pub records: usize,
}

impl IngestReport {
    fn print(&self, name: &str, unit: &str, dry_run: bool) {
        if dry_run {
            println!("sync {} (dry-run)", name);
        } else {
            println!("sync {}", name);
        }
        println!("  {} scraped: {}", unit, self.scraped);
        println!("  {} skipped: {}", unit, self.skipped);
        println!("  {} failed: {}", unit, self.failed);
        println!("  documents: {}", self.documents);
        println!("  chunks: {}", self.chunks);
        if !dry_run {
            println!("  records written: {}", self.records);
        }
        println!("ok");
    }
}

/// Chunk a batch of documents and store the chunks. Returns
/// `(chunks, records)`; with `dry_run` nothing is embedded or stored.
pub async fn ingest_batch(
    vectors: &VectorStoreAdapter,
    documents: &[Document],
    chunking: &ChunkConfig,
    dry_run: bool,
) -> Result<(usize, usize)> {
    let chunks = chunk_documents(documents, chunking);
    if dry_run || chunks.is_empty() {
        return Ok((chunks.len(), 0));
    }
    let records = vectors.add(&chunks).await?;
    Ok((chunks.len(), records))
}

/// Ingest every non-excluded Confluence space.
pub async fn sync_confluence(
    vectors: &VectorStoreAdapter,
    client: &ConfluenceClient,
    exclude_spaces: &[String],
    chunking: &ChunkConfig,
    dry_run: bool,
) -> Result<IngestReport> {
    let spaces = client
        .list_spaces(exclude_spaces)
        .await
        .context("Failed to fetch list of Confluence spaces")?;
    tracing::info!(spaces = spaces.len(), "listed confluence spaces");

    let mut report = IngestReport::default();
    for space in &spaces {
        tracing::info!(space = %space.name, space_id = %space.id, "fetching pages in space");
        let documents = match client.scrape_space(space).await {
            Ok(documents) => documents,
            Err(e) => {
                tracing::error!(space = %space.name, error = %e, "failed to scrape space");
                report.failed += 1;
                continue;
            }
        };

        match ingest_batch(vectors, &documents, chunking, dry_run).await {
            Ok((chunks, records)) => {
                report.scraped += 1;
                report.documents += documents.len();
                report.chunks += chunks;
                report.records += records;
            }
            Err(e) => {
                tracing::error!(
                    space = %space.name,
                    documents = documents.len(),
                    error = %e,
                    "failed to store space"
                );
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

/// Ingest matching files from every repository of the client's organization.
///
/// `max_repos` stops the walk early once that many repositories were visited.
pub async fn sync_github(
    vectors: &VectorStoreAdapter,
    client: &GithubClient,
    chunking: &ChunkConfig,
    max_repos: Option<usize>,
    dry_run: bool,
) -> Result<IngestReport> {
    let mut report = IngestReport::default();
    let mut visited = 0usize;
    let mut page = 1u32;

    'pages: loop {
        let repos = client.list_repositories(page).await.with_context(|| {
            format!(
                "Failed to get list of repos in {} (page {})",
                client.organization(),
                page
            )
        })?;
        if repos.is_empty() {
            break;
        }
        tracing::info!(page, repos = repos.len(), "listed repositories");

        for repo in &repos {
            if max_repos.is_some_and(|max| visited >= max) {
                break 'pages;
            }
            visited += 1;

            if repo.archived {
                report.skipped += 1;
                continue;
            }

            let documents = match client.scrape_repository(repo).await {
                Ok(documents) => documents,
                Err(e @ RepoScrapeError::Tree { .. }) => {
                    tracing::warn!(error = %e, "skipping repository");
                    report.skipped += 1;
                    continue;
                }
                Err(e @ RepoScrapeError::File { .. }) => {
                    tracing::error!(error = %e, "dropping repository batch");
                    report.failed += 1;
                    continue;
                }
            };
            if documents.is_empty() {
                report.skipped += 1;
                continue;
            }

            tracing::info!(repo = %repo.name, documents = documents.len(), "ingesting documents");
            match ingest_batch(vectors, &documents, chunking, dry_run).await {
                Ok((chunks, records)) => {
                    report.scraped += 1;
                    report.documents += documents.len();
                    report.chunks += chunks;
                    report.records += records;
                }
                Err(e) => {
                    tracing::error!(
                        repo = %repo.name,
                        files = documents.len(),
                        error = %e,
                        "failed to process files"
                    );
                    report.failed += 1;
                }
            }
        }

        page += 1;
    }

    Ok(report)
}

pub async fn run_sync_confluence(services: &Services, dry_run: bool) -> Result<()> {
    let config = &services.config;
    let credentials = config.require_confluence()?;
    let chunking = config.confluence_chunk_config()?;
    let client = ConfluenceClient::new(&credentials)?;

    let report = sync_confluence(
        &services.vectors,
        &client,
        &config.connectors.confluence.exclude_spaces,
        &chunking,
        dry_run,
    )
    .await?;
    report.print("confluence", "spaces", dry_run);
    Ok(())
}

pub async fn run_sync_github(
    services: &Services,
    organization: Option<String>,
    extension: Option<String>,
    max_repos: Option<usize>,
    dry_run: bool,
) -> Result<()> {
    let config = &services.config;
    let token = config.require_github_token()?;
    let organization = organization
        .or_else(|| config.connectors.github.organization.clone())
        .context("No GitHub organization given (use --org or connectors.github.organization)")?;

    let mut github = config.connectors.github.clone();
    if let Some(ext) = extension {
        github.extension = ext;
    }
    let chunking = config.github_chunk_config()?;
    let client = GithubClient::new(&github, organization, token)?;

    let report = sync_github(&services.vectors, &client, &chunking, max_repos, dry_run).await?;
    report.print("github", "repos", dry_run);
    Ok(())
}
