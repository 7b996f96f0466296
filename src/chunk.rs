//! Word-boundary text chunker.
//!
//! Splits document text into [`Chunk`]s of at most `chunk_size` characters,
//! carrying up to `chunk_overlap` characters of trailing words into the next
//! chunk. A trailing chunk shorter than `min_chunk_size` is folded into its
//! predecessor.
//!
//! Each chunk carries a SHA-256 hash of its text for staleness detection.

use anyhow::{bail, Result};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::Chunk;

/// Chunking parameters chosen once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub min_chunk_size: usize,
}

impl IngestionConfig {
    pub const fn new(chunk_size: usize, chunk_overlap: usize, min_chunk_size: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            min_chunk_size,
        }
    }

    /// Requires `chunk_overlap < min_chunk_size <= chunk_size`.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_overlap >= self.min_chunk_size {
            bail!(
                "chunk_overlap ({}) must be smaller than min_chunk_size ({})",
                self.chunk_overlap,
                self.min_chunk_size
            );
        }
        if self.min_chunk_size > self.chunk_size {
            bail!(
                "min_chunk_size ({}) must not exceed chunk_size ({})",
                self.min_chunk_size,
                self.chunk_size
            );
        }
        Ok(())
    }
}

/// Split text into chunks with contiguous indices starting at 0.
///
/// Whitespace-only text produces no chunks.
pub fn chunk_text(document_id: &str, text: &str, config: &IngestionConfig) -> Vec<Chunk> {
    let words = split_words(text, config.chunk_size.max(1));
    if words.is_empty() {
        return Vec::new();
    }

    let ranges = plan_ranges(&words, config);

    ranges
        .into_iter()
        .enumerate()
        .map(|(i, (start, end))| make_chunk(document_id, i as i64, &words[start..end].join(" ")))
        .collect()
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Whitespace-separated words, with words longer than `max_chars` hard-split.
fn split_words(text: &str, max_chars: usize) -> Vec<String> {
    let mut words = Vec::new();
    for word in text.split_whitespace() {
        if char_len(word) <= max_chars {
            words.push(word.to_string());
            continue;
        }
        let chars: Vec<char> = word.chars().collect();
        for piece in chars.chunks(max_chars) {
            words.push(piece.iter().collect());
        }
    }
    words
}

fn plan_ranges(words: &[String], config: &IngestionConfig) -> Vec<(usize, usize)> {
    let lens: Vec<usize> = words.iter().map(|w| char_len(w)).collect();
    let n = words.len();
    let mut ranges: Vec<(usize, usize)> = Vec::new();
    let mut start = 0;

    while start < n {
        let mut end = start;
        let mut len = 0;
        while end < n {
            let add = lens[end] + usize::from(end > start);
            if len + add > config.chunk_size && end > start {
                break;
            }
            len += add;
            end += 1;
        }
        ranges.push((start, end));
        if end == n {
            break;
        }

        // Step back over trailing words that fit in the overlap budget,
        // always advancing by at least one word.
        let mut next = end;
        let mut overlap = 0;
        while next > start + 1 {
            let add = lens[next - 1] + 1;
            if overlap + add > config.chunk_overlap {
                break;
            }
            overlap += add;
            next -= 1;
        }
        start = next;
    }

    if ranges.len() > 1 {
        let (last_start, last_end) = ranges[ranges.len() - 1];
        let last_len: usize =
            lens[last_start..last_end].iter().sum::<usize>() + (last_end - last_start - 1);
        if last_len < config.min_chunk_size {
            ranges.pop();
            if let Some(prev) = ranges.last_mut() {
                prev.1 = last_end;
            }
        }
    }

    ranges
}

fn make_chunk(document_id: &str, index: i64, text: &str) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: Uuid::new_v4().to_string(),
        document_id: document_id.to_string(),
        chunk_index: index,
        text: text.to_string(),
        hash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: IngestionConfig = IngestionConfig::new(20, 6, 8);

    #[test]
    fn validate_enforces_ordering() {
        assert!(IngestionConfig::new(300, 50, 200).validate().is_ok());
        assert!(IngestionConfig::new(200, 100, 100).validate().is_err());
        assert!(IngestionConfig::new(200, 50, 300).validate().is_err());
    }

    #[test]
    fn small_text_single_chunk() {
        let chunks = chunk_text("doc_0", "Hello, world!", &IngestionConfig::new(300, 50, 200));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].text, "Hello, world!");
        assert_eq!(chunks[0].document_id, "doc_0");
    }

    #[test]
    fn whitespace_only_text_has_no_chunks() {
        assert!(chunk_text("doc_0", "  \n\t ", &SMALL).is_empty());
    }

    #[test]
    fn chunks_respect_size_and_overlap() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda mu";
        let chunks = chunk_text("doc_0", text, &SMALL);
        assert!(chunks.len() > 1);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i as i64);
        }
        // Every chunk but a folded tail fits the size budget.
        for c in &chunks[..chunks.len() - 1] {
            assert!(c.text.chars().count() <= SMALL.chunk_size, "{:?}", c.text);
        }
        // Consecutive chunks share their boundary word when it fits the overlap.
        let first_last_word = chunks[0].text.split(' ').last().unwrap();
        assert!(chunks[1].text.starts_with(first_last_word));
    }

    #[test]
    fn short_tail_is_folded_into_previous_chunk() {
        let text = "aaaa bbbb cccc dddd eeee f";
        let config = IngestionConfig::new(20, 0, 7);
        let chunks = chunk_text("doc_0", text, &config);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.ends_with(" f"));
    }

    #[test]
    fn long_words_are_hard_split() {
        let word = "x".repeat(45);
        let chunks = chunk_text("doc_0", &word, &IngestionConfig::new(20, 0, 1));
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].text.len(), 5);
    }

    #[test]
    fn deterministic_text_and_hashes() {
        let text = "Alpha Beta Gamma Delta Epsilon Zeta Eta Theta";
        let c1 = chunk_text("doc_0", text, &SMALL);
        let c2 = chunk_text("doc_0", text, &SMALL);
        assert_eq!(c1.len(), c2.len());
        for (a, b) in c1.iter().zip(c2.iter()) {
            assert_eq!(a.text, b.text);
            assert_eq!(a.hash, b.hash);
        }
    }
}
