//! In-memory [`DocumentCollection`] for tests and library use.
//!
//! Uses `Vec`s behind `std::sync::RwLock`. Retrieval is brute-force cosine
//! similarity when an embedder is configured, otherwise a term-overlap count.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::chunk::{chunk_text, IngestionConfig};
use crate::embedding::{cosine_similarity, Embedder};
use crate::models::{Chunk, DocumentMetadata, RetrievedChunk};
use crate::stats::CorpusStats;

use super::{query_terms, DocumentCollection, StoreError};

struct StoredDoc {
    metadata: DocumentMetadata,
    text: String,
}

struct StoredChunk {
    chunk: Chunk,
    source: String,
    vector: Option<Vec<f32>>,
}

pub struct InMemoryCollection {
    ingestion: IngestionConfig,
    embedder: Option<Arc<dyn Embedder>>,
    docs: RwLock<Vec<StoredDoc>>,
    chunks: RwLock<Vec<StoredChunk>>,
}

impl InMemoryCollection {
    pub fn new(ingestion: IngestionConfig) -> Self {
        Self {
            ingestion,
            embedder: None,
            docs: RwLock::new(Vec::new()),
            chunks: RwLock::new(Vec::new()),
        }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Stored text for a document id.
    pub fn document_text(&self, document_id: &str) -> Option<String> {
        self.docs
            .read()
            .unwrap()
            .iter()
            .find(|d| d.metadata.document_id == document_id)
            .map(|d| d.text.clone())
    }

    pub fn document_count(&self) -> usize {
        self.docs.read().unwrap().len()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.read().unwrap().len()
    }
}

#[async_trait]
impl DocumentCollection for InMemoryCollection {
    async fn exists(&self, document_id: &str) -> Result<bool, StoreError> {
        Ok(self
            .docs
            .read()
            .unwrap()
            .iter()
            .any(|d| d.metadata.document_id == document_id))
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

        self.docs.write().unwrap().push(StoredDoc {
            metadata: metadata.clone(),
            text: text.to_string(),
        });

        let mut stored = self.chunks.write().unwrap();
        let mut vectors = vectors.map(Vec::into_iter);
        for chunk in chunks {
            stored.push(StoredChunk {
                chunk,
                source: metadata.source.clone(),
                vector: vectors.as_mut().and_then(Iterator::next),
            });
        }
        Ok(())
    }

    async fn retrieve(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RetrievedChunk>, StoreError> {
        let query_vec = match &self.embedder {
            Some(embedder) => embedder.embed(&[query.to_string()]).await?.into_iter().next(),
            None => None,
        };
        let terms = query_terms(query);

        let chunks = self.chunks.read().unwrap();
        let mut scored: Vec<(f64, &StoredChunk)> = chunks
            .iter()
            .map(|sc| {
                let score = match (&query_vec, &sc.vector) {
                    (Some(q), Some(v)) => cosine_similarity(q, v) as f64,
                    _ => {
                        let text = sc.chunk.text.to_lowercase();
                        terms.iter().filter(|t| text.contains(t.as_str())).count() as f64
                    }
                };
                (score, sc)
            })
            .collect();

        if query_vec.is_none() && scored.iter().all(|(score, _)| *score == 0.0) {
            // Nothing matched; fall back to collection order.
            scored.truncate(limit);
        } else {
            scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
            scored.retain(|(score, _)| query_vec.is_some() || *score > 0.0);
            scored.truncate(limit);
        }

        Ok(scored
            .into_iter()
            .map(|(score, sc)| RetrievedChunk {
                document_id: sc.chunk.document_id.clone(),
                source: sc.source.clone(),
                text: sc.chunk.text.clone(),
                score,
            })
            .collect())
    }

    async fn stats(&self) -> Result<CorpusStats, StoreError> {
        let docs = self.docs.read().unwrap();
        Ok(CorpusStats::from_texts(docs.iter().map(|d| d.text.as_str())))
    }
}
