//! SQLite-backed [`DocumentCollection`].
//!
//! One database file holds any number of collections. Chunks are indexed in
//! FTS5 for keyword retrieval; when an embedder is configured their vectors
//! are stored as BLOBs and ranked by cosine similarity in Rust.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::chunk::{chunk_text, IngestionConfig};
use crate::db;
use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob, Embedder};
use crate::migrate;
use crate::models::{DocumentMetadata, RetrievedChunk};
use crate::stats::CorpusStats;

use super::{query_terms, DocumentCollection, StoreError};

pub struct SqliteCollection {
    pool: SqlitePool,
    collection: String,
    ingestion: IngestionConfig,
    embedder: Option<Arc<dyn Embedder>>,
}

impl SqliteCollection {
    /// Open (creating if needed) the database at `path` and select `collection`.
    pub async fn open(
        path: &Path,
        collection: &str,
        ingestion: IngestionConfig,
        embedder: Option<Arc<dyn Embedder>>,
    ) -> Result<Self> {
        let pool = db::connect(path).await?;
        migrate::run_migrations(&pool).await?;
        tracing::debug!(path = %path.display(), collection, "collection opened");

        Ok(Self {
            pool,
            collection: collection.to_string(),
            ingestion,
            embedder,
        })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn vector_candidates(
        &self,
        embedder: &dyn Embedder,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RetrievedChunk>, StoreError> {
        let query_vec = embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();

        let rows = sqlx::query(
            r#"
            SELECT c.document_id, c.text, c.embedding, d.source
            FROM chunks c
            JOIN documents d ON d.collection = c.collection AND d.document_id = c.document_id
            WHERE c.collection = ? AND c.embedding IS NOT NULL
            "#,
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await?;

        let mut candidates: Vec<RetrievedChunk> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                RetrievedChunk {
                    document_id: row.get("document_id"),
                    source: row.get("source"),
                    text: row.get("text"),
                    score: cosine_similarity(&query_vec, &blob_to_vec(&blob)) as f64,
                }
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(limit);
        Ok(candidates)
    }

    async fn keyword_candidates(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RetrievedChunk>, StoreError> {
        let terms = query_terms(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let fts_query = terms
            .iter()
            .map(|t| format!("\"{}\"", t))
            .collect::<Vec<_>>()
            .join(" OR ");

        let rows = sqlx::query(
            r#"
            SELECT c.document_id, c.text, d.source, chunks_fts.rank AS rank
            FROM chunks_fts
            JOIN chunks c ON c.id = chunks_fts.chunk_id
            JOIN documents d ON d.collection = c.collection AND d.document_id = c.document_id
            WHERE chunks_fts MATCH ? AND chunks_fts.collection = ?
            ORDER BY rank
            LIMIT ?
            "#,
        )
        .bind(&fts_query)
        .bind(&self.collection)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let rank: f64 = row.get("rank");
                RetrievedChunk {
                    document_id: row.get("document_id"),
                    source: row.get("source"),
                    text: row.get("text"),
                    score: -rank, // negate so higher = better
                }
            })
            .collect())
    }

    async fn leading_chunks(&self, limit: usize) -> Result<Vec<RetrievedChunk>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT c.document_id, c.text, d.source
            FROM chunks c
            JOIN documents d ON d.collection = c.collection AND d.document_id = c.document_id
            WHERE c.collection = ?
            ORDER BY d.rowid, c.chunk_index
            LIMIT ?
            "#,
        )
        .bind(&self.collection)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| RetrievedChunk {
                document_id: row.get("document_id"),
                source: row.get("source"),
                text: row.get("text"),
                score: 0.0,
            })
            .collect())
    }
}

#[async_trait]
impl DocumentCollection for SqliteCollection {
    async fn exists(&self, document_id: &str) -> Result<bool, StoreError> {
        let found: bool = sqlx::query_scalar(
            "SELECT COUNT(*) > 0 FROM documents WHERE collection = ? AND document_id = ?",
        )
        .bind(&self.collection)
        .bind(document_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(found)
    }

    async fn add(&self, text: &str, metadata: &DocumentMetadata) -> Result<(), StoreError> {
        if self.exists(&metadata.document_id).await? {
            return Err(StoreError::Duplicate(metadata.document_id.clone()));
        }

        let chunks = chunk_text(&metadata.document_id, text, &self.ingestion);
        let vectors = match &self.embedder {
            Some(embedder) if !chunks.is_empty() => {
                let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
                Some(embedder.embed(&texts).await?)
            }
            _ => None,
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO documents (collection, document_id, source, file_name, text, added_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&self.collection)
        .bind(&metadata.document_id)
        .bind(&metadata.source)
        .bind(&metadata.file_name)
        .bind(text)
        .bind(chrono::Utc::now().timestamp())
        .execute(&mut *tx)
        .await?;

        for (i, chunk) in chunks.iter().enumerate() {
            let blob = vectors
                .as_ref()
                .and_then(|v| v.get(i))
                .map(|v| vec_to_blob(v));

            sqlx::query(
                r#"
                INSERT INTO chunks (id, collection, document_id, chunk_index, text, hash, embedding)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&chunk.id)
            .bind(&self.collection)
            .bind(&chunk.document_id)
            .bind(chunk.chunk_index)
            .bind(&chunk.text)
            .bind(&chunk.hash)
            .bind(blob)
            .execute(&mut *tx)
            .await?;

            sqlx::query("INSERT INTO chunks_fts (chunk_id, collection, text) VALUES (?, ?, ?)")
                .bind(&chunk.id)
                .bind(&self.collection)
                .bind(&chunk.text)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        tracing::debug!(
            document_id = %metadata.document_id,
            chunks = chunks.len(),
            embedded = vectors.is_some(),
            "document stored"
        );
        Ok(())
    }

    async fn retrieve(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RetrievedChunk>, StoreError> {
        if let Some(embedder) = &self.embedder {
            let hits = self.vector_candidates(embedder.as_ref(), query, limit).await?;
            if !hits.is_empty() {
                return Ok(hits);
            }
        }

        let hits = self.keyword_candidates(query, limit).await?;
        if !hits.is_empty() {
            return Ok(hits);
        }

        self.leading_chunks(limit).await
    }

    async fn stats(&self) -> Result<CorpusStats, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS n,
                   AVG(LENGTH(text)) AS avg_len,
                   MIN(LENGTH(text)) AS min_len,
                   MAX(LENGTH(text)) AS max_len
            FROM documents
            WHERE collection = ?
            "#,
        )
        .bind(&self.collection)
        .fetch_one(&self.pool)
        .await?;

        let n: i64 = row.get("n");
        Ok(CorpusStats {
            document_count: n as u64,
            average_length: row.get::<Option<f64>, _>("avg_len").unwrap_or(0.0),
            min_length: row.get::<Option<i64>, _>("min_len").unwrap_or(0) as u64,
            max_length: row.get::<Option<i64>, _>("max_len").unwrap_or(0) as u64,
        })
    }
}
