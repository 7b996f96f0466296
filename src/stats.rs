//! Corpus statistics for the report footer.
//!
//! Lengths are measured in characters, not bytes.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CorpusStats {
    pub document_count: u64,
    pub average_length: f64,
    pub min_length: u64,
    pub max_length: u64,
}

impl CorpusStats {
    /// Summarize a set of document lengths. An empty set yields all zeros.
    pub fn from_lengths<I>(lengths: I) -> Self
    where
        I: IntoIterator<Item = u64>,
    {
        let mut count = 0u64;
        let mut total = 0u64;
        let mut min = u64::MAX;
        let mut max = 0u64;

        for len in lengths {
            count += 1;
            total += len;
            min = min.min(len);
            max = max.max(len);
        }

        if count == 0 {
            return Self::default();
        }

        Self {
            document_count: count,
            average_length: total as f64 / count as f64,
            min_length: min,
            max_length: max,
        }
    }

    pub fn from_texts<'a, I>(texts: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self::from_lengths(texts.into_iter().map(|t| t.chars().count() as u64))
    }
}
