//! Document collection abstraction.
//!
//! The [`DocumentCollection`] trait is the boundary to the external
//! embedding/vector store: add a document under an id, check whether an id
//! exists, and retrieve context passages for a query. Backends:
//!
//! | Backend | Use |
//! |---------|-----|
//! | [`sqlite::SqliteCollection`] | one SQLite file per database, used by the CLI |
//! | [`memory::InMemoryCollection`] | tests and library embedding |

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{DocumentMetadata, RetrievedChunk};
use crate::stats::CorpusStats;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend does not implement this operation.
    #[error("operation not supported by this store: {0}")]
    Unsupported(&'static str),
    #[error("document {0} already exists")]
    Duplicate(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Abstract document collection.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`exists`](DocumentCollection::exists) | Is a document id already stored? |
/// | [`add`](DocumentCollection::add) | Chunk, embed, and persist a document |
/// | [`retrieve`](DocumentCollection::retrieve) | Context passages for a query |
/// | [`stats`](DocumentCollection::stats) | Document count and text lengths |
#[async_trait]
pub trait DocumentCollection: Send + Sync {
    async fn exists(&self, document_id: &str) -> Result<bool, StoreError>;

    /// Persist `text` under `metadata.document_id`. Adding an id that is
    /// already stored is [`StoreError::Duplicate`]; content is never replaced.
    async fn add(&self, text: &str, metadata: &DocumentMetadata) -> Result<(), StoreError>;

    async fn retrieve(&self, query: &str, limit: usize)
        -> Result<Vec<RetrievedChunk>, StoreError>;

    async fn stats(&self) -> Result<CorpusStats, StoreError> {
        Err(StoreError::Unsupported("stats"))
    }
}

/// Lowercased alphanumeric terms of a query, for keyword matching.
pub(crate) fn query_terms(query: &str) -> Vec<String> {
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 2)
        .map(|t| t.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_terms_drop_punctuation_and_short_words() {
        assert_eq!(
            query_terms("What's the *top* topic, e.g. \"Rust\"?"),
            vec!["what", "the", "top", "topic", "rust"]
        );
    }
}
