//! # info-gpt CLI
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `info-gpt init` | Create the vector store database |
//! | `info-gpt sources` | Show which connectors are configured |
//! | `info-gpt sync confluence` | Ingest every Confluence space |
//! | `info-gpt sync github` | Ingest matching files across a GitHub organization |
//! | `info-gpt search "<query>"` | Print the nearest stored chunks |
//! | `info-gpt ask "<question>"` | Answer a question from stored content |
//! | `info-gpt debug-logs <file>` | Ask the model to explain Docker build logs |
//! | `info-gpt serve` | Start the Slack / query HTTP API |
//!
//! ## Examples
//!
//! ```bash
//! export CONFLUENCE_DOMAIN=https://acme.atlassian.net/wiki/
//! export CONFLUENCE_USERNAME=bot@acme.io CONFLUENCE_PASSWORD=...
//! info-gpt sync confluence
//!
//! GITHUB_TOKEN=... info-gpt sync github --org acme --extension .md
//!
//! SLACK_TOKEN=... OPENAI_API_KEY=... info-gpt serve
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use info_gpt::services::Services;
use info_gpt::{answer, config, debug_logs, ingest, llm, logging, migrate, search, server, sources};

/// Retrieval-augmented question answering over Confluence and GitHub.
///
/// Settings come from an optional TOML file and environment variables
/// (`DB_DIRECTORY`, `MODEL_TYPE`, `SLACK_TOKEN`, ...).
#[derive(Parser)]
#[command(
    name = "info-gpt",
    about = "Retrieval-augmented question answering over Confluence and GitHub",
    version
)]
struct Cli {
    /// Path to a TOML configuration file.
    ///
    /// Defaults to `./config/info-gpt.toml` when that file exists.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the vector store schema. Safe to run repeatedly.
    Init,

    /// List connectors and whether their settings are present.
    Sources,

    /// Scrape a source and ingest it into the vector store.
    Sync {
        #[command(subcommand)]
        source: SyncSource,
    },

    /// Print the stored chunks nearest to a query.
    Search {
        query: String,

        /// Number of results (defaults to `retrieval.k`).
        #[arg(long)]
        limit: Option<usize>,

        /// Only consider chunks from this exact source URL.
        #[arg(long)]
        source: Option<String>,
    },

    /// Answer a question from the ingested content.
    Ask {
        question: String,

        /// Also print the retrieved context.
        #[arg(long)]
        show_sources: bool,
    },

    /// Explain Docker build logs with the language model (`-` reads stdin).
    DebugLogs { path: PathBuf },

    /// Start the HTTP API and background workers.
    Serve,
}

#[derive(Subcommand)]
enum SyncSource {
    /// All global spaces except `connectors.confluence.exclude_spaces`.
    Confluence {
        /// Scrape and chunk without embedding or writing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Non-archived repositories of an organization.
    Github {
        /// Organization (defaults to `connectors.github.organization`).
        #[arg(long)]
        org: Option<String>,

        /// File extension to ingest (defaults to `connectors.github.extension`).
        #[arg(long)]
        extension: Option<String>,

        /// Stop after this many repositories.
        #[arg(long)]
        max_repos: Option<usize>,

        /// Scrape and chunk without embedding or writing.
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing("info");
    let cli = Cli::parse();
    let cfg = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Sources => {
            sources::list_sources(&cfg)?;
        }
        Commands::Sync { source } => match source {
            SyncSource::Confluence { dry_run } => {
                cfg.require_confluence()?;
                let services = Services::open(cfg).await?;
                ingest::run_sync_confluence(&services, dry_run).await?;
            }
            SyncSource::Github {
                org,
                extension,
                max_repos,
                dry_run,
            } => {
                cfg.require_github_token()?;
                let services = Services::open(cfg).await?;
                ingest::run_sync_github(&services, org, extension, max_repos, dry_run).await?;
            }
        },
        Commands::Search {
            query,
            limit,
            source,
        } => {
            let services = Services::open(cfg).await?;
            search::run_search(&services, &query, limit, source).await?;
        }
        Commands::Ask {
            question,
            show_sources,
        } => {
            let services = Services::open_with_model(cfg).await?;
            answer::run_ask(&services, &question, show_sources).await?;
        }
        Commands::DebugLogs { path } => {
            let model = llm::create_model(&cfg.llm)?;
            debug_logs::run_debug_logs(model.as_ref(), &path).await?;
        }
        Commands::Serve => {
            cfg.require_slack_token()?;
            let services = Services::open_with_model(cfg).await?;
            server::run_server(Arc::new(services)).await?;
        }
    }

    Ok(())
}
