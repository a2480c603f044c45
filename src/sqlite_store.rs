//! SQLite-backed [`VectorStore`].
//!
//! Records live in `records`, vectors in `record_vectors` as little-endian
//! f32 BLOBs. Every row is scoped to a collection name so several corpora
//! can share one database file. Similarity search is a brute-force cosine
//! scan over the collection, limited to vectors written by the same
//! embedding model with the query's dimension. Records embedded by another
//! model stay stored but are never returned by [`VectorStore::nearest`].

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use info_gpt_core::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use info_gpt_core::models::{EmbeddingRecord, ScoredChunk};
use info_gpt_core::store::{top_k, VectorStore};

pub struct SqliteVectorStore {
    pool: SqlitePool,
    collection: String,
    model: String,
}

impl SqliteVectorStore {
    /// `model` is recorded next to each vector and scopes similarity search.
    pub fn new(pool: SqlitePool, collection: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            pool,
            collection: collection.into(),
            model: model.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

fn row_to_scored(row: &sqlx::sqlite::SqliteRow, score: f32) -> ScoredChunk {
    ScoredChunk {
        id: row.get("id"),
        text: row.get("text"),
        source: row.get("source"),
        title: row.get("title"),
        score,
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn insert(&self, records: &[EmbeddingRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO records (id, collection, text, source, title, chunk_index, hash, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.id)
            .bind(&self.collection)
            .bind(&record.chunk.text)
            .bind(&record.chunk.source)
            .bind(&record.chunk.title)
            .bind(record.chunk.chunk_index as i64)
            .bind(&record.chunk.hash)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO record_vectors (record_id, model, dims, embedding) VALUES (?, ?, ?, ?)",
            )
            .bind(&record.id)
            .bind(&self.model)
            .bind(record.vector.len() as i64)
            .bind(vec_to_blob(&record.vector))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn nearest(
        &self,
        query_vec: &[f32],
        k: usize,
        source: Option<&str>,
    ) -> Result<Vec<ScoredChunk>> {
        let dims = query_vec.len() as i64;
        let rows = match source {
            Some(source) => {
                sqlx::query(
                    r#"
                    SELECT r.id, r.text, r.source, r.title, v.embedding
                    FROM records r
                    JOIN record_vectors v ON v.record_id = r.id
                    WHERE r.collection = ? AND v.model = ? AND v.dims = ? AND r.source = ?
                    "#,
                )
                .bind(&self.collection)
                .bind(&self.model)
                .bind(dims)
                .bind(source)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT r.id, r.text, r.source, r.title, v.embedding
                    FROM records r
                    JOIN record_vectors v ON v.record_id = r.id
                    WHERE r.collection = ? AND v.model = ? AND v.dims = ?
                    "#,
                )
                .bind(&self.collection)
                .bind(&self.model)
                .bind(dims)
                .fetch_all(&self.pool)
                .await?
            }
        };

        let candidates = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let score = cosine_similarity(query_vec, &blob_to_vec(&blob));
                row_to_scored(row, score)
            })
            .collect();

        Ok(top_k(candidates, k))
    }

    async fn find_by_source(&self, source: &str) -> Result<Vec<ScoredChunk>> {
        let rows = sqlx::query(
            r#"
            SELECT id, text, source, title
            FROM records
            WHERE collection = ? AND source = ?
            ORDER BY created_at, chunk_index
            "#,
        )
        .bind(&self.collection)
        .bind(source)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|row| row_to_scored(row, 1.0)).collect())
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE collection = ?")
            .bind(&self.collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}
