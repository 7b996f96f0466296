//! Multi-format text extraction.
//!
//! Connectors supply bytes plus a [`ContentKind`]; this module returns plain
//! UTF-8 text. Markdown is rendered to HTML rather than stripped, so the
//! stored text keeps tags such as `<h1>`.

use thiserror::Error;

use crate::models::ContentKind;

/// Terminal width used when flattening HTML pages to text.
const HTML_TEXT_WIDTH: usize = 120;

/// Extraction error. Callers skip the item and continue.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("HTML conversion failed: {0}")]
    Html(String),
}

/// Extracts plain text from document bytes.
pub fn extract_text(bytes: &[u8], kind: ContentKind) -> Result<String, ExtractError> {
    match kind {
        ContentKind::Text => Ok(String::from_utf8_lossy(bytes).into_owned()),
        ContentKind::Markdown => Ok(markdown_to_html(&String::from_utf8_lossy(bytes))),
        ContentKind::Pdf => extract_pdf(bytes),
        ContentKind::Html => html_to_text(bytes),
    }
}

/// Render CommonMark to HTML.
pub fn markdown_to_html(markdown: &str) -> String {
    let parser = pulldown_cmark::Parser::new(markdown);
    let mut html = String::with_capacity(markdown.len() * 3 / 2);
    pulldown_cmark::html::push_html(&mut html, parser);
    html
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;
    Ok(pages.concat())
}

fn html_to_text(bytes: &[u8]) -> Result<String, ExtractError> {
    html2text::from_read(bytes, HTML_TEXT_WIDTH).map_err(|e| ExtractError::Html(e.to_string()))
}
