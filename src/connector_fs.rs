//! Filesystem connector: walks a directory tree and extracts every
//! `.txt`, `.md`, and `.pdf` file into a [`FileRecord`].

use anyhow::{bail, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use walkdir::WalkDir;

use crate::extract::extract_text;
use crate::models::{ContentKind, DocumentMetadata, FileRecord};
use crate::progress::{ProgressEvent, ProgressReporter};

/// How document ids are assigned to extracted files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdStrategy {
    /// `doc_<n>` where `n` counts records produced so far in this run.
    /// Not stable across runs or across changes to the directory.
    Sequential,
    /// `doc_<16 hex chars of sha256(text)>`, stable across runs.
    ContentHash,
}

impl IdStrategy {
    pub fn assign(&self, index: usize, text: &str) -> String {
        match self {
            IdStrategy::Sequential => format!("doc_{}", index),
            IdStrategy::ContentHash => {
                let digest = Sha256::digest(text.as_bytes());
                let hex = format!("{:x}", digest);
                format!("doc_{}", &hex[..16])
            }
        }
    }
}

/// Recursively extract every recognized file under `root`.
///
/// Files with other extensions are skipped silently. A file that cannot be
/// read or extracted is logged and skipped; it does not consume an index.
pub fn scan_directory(
    root: &Path,
    strategy: IdStrategy,
    progress: &dyn ProgressReporter,
) -> Result<Vec<FileRecord>> {
    if !root.is_dir() {
        bail!("Source directory does not exist: {}", root.display());
    }

    progress.report(ProgressEvent::Discovering {
        root: root.display().to_string(),
    });

    let mut records = Vec::new();

    let walker = WalkDir::new(root).sort_by_file_name();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Some(kind) = ContentKind::from_path(path) else {
            tracing::debug!(path = %path.display(), "unsupported extension, skipped");
            continue;
        };

        match read_file(path, kind) {
            Ok(text) => {
                let document_id = strategy.assign(records.len(), &text);
                tracing::debug!(
                    path = %path.display(),
                    kind = kind.as_str(),
                    document_id = %document_id,
                    "file extracted"
                );
                records.push(file_record(path, kind, text, document_id));
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "extraction failed, file skipped");
            }
        }
    }

    tracing::info!(root = %root.display(), files = records.len(), "directory scanned");
    Ok(records)
}

fn read_file(path: &Path, kind: ContentKind) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(extract_text(&bytes, kind)?)
}

fn file_record(path: &Path, kind: ContentKind, text: String, document_id: String) -> FileRecord {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    FileRecord {
        path: path.to_path_buf(),
        kind,
        text,
        metadata: DocumentMetadata {
            source: path.display().to_string(),
            document_id,
            file_name,
        },
    }
}
