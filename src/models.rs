//! Core data models used throughout Topic Harness.
//!
//! These types represent the extracted files, stored chunks, parsed topics,
//! and chat turns that flow through the ingestion and analysis pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How a document's bytes are turned into plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// `.txt` files, read as-is.
    Text,
    /// `.md` files, rendered to HTML before storage.
    Markdown,
    /// `.pdf` files, text extracted page by page.
    Pdf,
    /// Web pages fetched by URL. Never selected from a file extension.
    Html,
}

impl ContentKind {
    /// Classify a path by extension (case-insensitive).
    ///
    /// Returns `None` for anything other than `txt`, `md`, or `pdf`.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "txt" => Some(ContentKind::Text),
            "md" => Some(ContentKind::Markdown),
            "pdf" => Some(ContentKind::Pdf),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Text => "txt",
            ContentKind::Markdown => "md",
            ContentKind::Pdf => "pdf",
            ContentKind::Html => "html",
        }
    }
}

/// Provenance attached to every stored document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentMetadata {
    /// Original file path or URL.
    pub source: String,
    pub document_id: String,
    pub file_name: String,
}

/// One extracted document, ready to hand to the store client.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub path: PathBuf,
    pub kind: ContentKind,
    pub text: String,
    pub metadata: DocumentMetadata,
}

/// A chunk of a document's text.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    pub hash: String,
}

/// A chunk returned as context for a query.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub document_id: String,
    pub source: String,
    pub text: String,
    pub score: f64,
}

/// Optional model-provided inputs for the score extension point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopicSignals {
    pub model_confidence: Option<f64>,
    pub answer: String,
    pub context: String,
    pub context_sources: Vec<String>,
}

/// A structured summary of one recurring theme in the corpus.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopicRecord {
    pub name: String,
    pub description: String,
    pub frequency: u64,
    pub importance: f64,
    pub example_mentions: Vec<String>,
    pub related_topics: String,
    pub source: String,
    pub signals: TopicSignals,
}

/// Speaker of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message in a conversation with the language model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}
