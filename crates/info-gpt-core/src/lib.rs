//! # info-gpt core
//!
//! Pure logic shared by the info-gpt service: data models, the overlapping
//! character chunker, the [`Embedder`](embedding::Embedder) trait with vector
//! helpers, and the [`VectorStore`](store::VectorStore) abstraction with an
//! in-memory implementation.
//!
//! This crate contains no tokio, sqlx, or HTTP dependencies.

pub mod chunk;
pub mod embedding;
pub mod models;
pub mod store;
