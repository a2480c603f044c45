//! # info-gpt
//!
//! Retrieval-augmented question answering over an organization's Confluence
//! pages and GitHub repositories, served to Slack and over HTTP.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐   ┌──────────────┐   ┌──────────┐
//! │    Scrapers     │──▶│   Pipeline    │──▶│  SQLite   │
//! │ Confluence / GH │   │ Chunk+Embed  │   │  vectors  │
//! └─────────────────┘   └──────────────┘   └────┬─────┘
//!                                               │
//!                        ┌──────────────────────┤
//!                        ▼                      ▼
//!                  ┌──────────┐          ┌────────────┐
//!                  │   CLI    │          │ HTTP + jobs │
//!                  │(info-gpt)│          │ Slack/query │
//!                  └──────────┘          └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! info-gpt init                          # create the vector store
//! info-gpt sync confluence               # ingest every Confluence space
//! info-gpt sync github --org acme        # ingest .md files across an org
//! info-gpt search "vpn access"
//! info-gpt ask "How do I get VPN access?"
//! info-gpt serve                         # Slack + /query/ API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML + environment configuration |
//! | [`connector_confluence`] | Confluence space/page scraper |
//! | [`connector_github`] | GitHub organization file scraper |
//! | [`scrape`] | Scraper error type and shared HTTP helpers |
//! | [`embedding`] | Embedding providers |
//! | [`llm`] | Language model providers |
//! | [`sqlite_store`] | SQLite vector store |
//! | [`vector_store`] | Text-in, chunks-out store adapter |
//! | [`search`] | Retriever and `search` command |
//! | [`answer`] | Prompting and answer formatting |
//! | [`ingest`] | Sync commands |
//! | [`tasks`] | Background job queue and Slack delivery |
//! | [`server`] | HTTP endpoints |
//! | [`services`] | Process-wide clients |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |

pub mod answer;
pub mod config;
pub mod connector_confluence;
pub mod connector_github;
pub mod db;
pub mod debug_logs;
pub mod embedding;
pub mod http;
pub mod ingest;
pub mod llm;
pub mod logging;
pub mod migrate;
pub mod scrape;
pub mod search;
pub mod server;
pub mod services;
pub mod sources;
pub mod sqlite_store;
pub mod tasks;
pub mod vector_store;
