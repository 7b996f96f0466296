//! Ingestion loop: extracted records → store client.
//!
//! Each record is added unless its id is already stored. A record the
//! store rejects is logged and counted; the loop moves on to the next one.

use anyhow::Result;

use crate::client::{AddOutcome, StoreClient};
use crate::models::FileRecord;
use crate::progress::{ProgressEvent, ProgressReporter};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub added: u64,
    pub skipped: u64,
    pub failed: u64,
}

impl IngestSummary {
    pub fn total(&self) -> u64 {
        self.added + self.skipped + self.failed
    }
}

pub async fn ingest_records(
    client: &StoreClient,
    records: &[FileRecord],
    progress: &dyn ProgressReporter,
) -> Result<IngestSummary> {
    let mut summary = IngestSummary::default();
    let total = records.len() as u64;

    for (i, record) in records.iter().enumerate() {
        let document_id = &record.metadata.document_id;
        let skipped = match client.add(&record.text, &record.metadata).await {
            Ok(AddOutcome::Added) => {
                summary.added += 1;
                false
            }
            Ok(AddOutcome::Skipped) => {
                summary.skipped += 1;
                true
            }
            Err(e) => {
                tracing::warn!(
                    document_id = %document_id,
                    source = %record.metadata.source,
                    error = %format!("{:#}", e),
                    "failed to store document"
                );
                summary.failed += 1;
                false
            }
        };

        progress.report(ProgressEvent::Ingesting {
            n: i as u64 + 1,
            total,
            document_id: document_id.clone(),
            skipped,
        });
    }

    tracing::info!(
        added = summary.added,
        skipped = summary.skipped,
        failed = summary.failed,
        "ingestion finished"
    );
    Ok(summary)
}
