//! Web page connector: fetches one URL and turns it into a [`FileRecord`].

use anyhow::{bail, Context, Result};
use std::path::PathBuf;

use crate::extract::extract_text;
use crate::models::{ContentKind, DocumentMetadata, FileRecord};

/// Fetch `url` and extract its text. HTML bodies are flattened; any other
/// content type is taken as text.
pub async fn fetch_url(client: &reqwest::Client, url: &str) -> Result<FileRecord> {
    let resp = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch URL: {}", url))?;

    let status = resp.status();
    if !status.is_success() {
        bail!("Fetching {} returned HTTP {}", url, status);
    }

    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let body = resp
        .bytes()
        .await
        .context("Failed to read response body")?;

    let kind = kind_for_content_type(&content_type);
    let text = extract_text(&body, kind)?;

    tracing::info!(url, size = text.len(), content_type = %content_type, "URL fetched");
    Ok(url_record(url, kind, text))
}

fn kind_for_content_type(content_type: &str) -> ContentKind {
    if content_type.contains("html") {
        ContentKind::Html
    } else if content_type.contains("pdf") {
        ContentKind::Pdf
    } else {
        ContentKind::Text
    }
}

fn url_record(url: &str, kind: ContentKind, text: String) -> FileRecord {
    let file_name = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(url)
        .to_string();

    FileRecord {
        path: PathBuf::from(url),
        kind,
        text,
        metadata: DocumentMetadata {
            source: url.to_string(),
            document_id: "doc_0".to_string(),
            file_name,
        },
    }
}
