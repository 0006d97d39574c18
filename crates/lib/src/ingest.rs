//! # Ingestion Pipeline
//!
//! Orchestrates the data flow for one upload: raw decoded text →
//! normalization → document row → structured extraction → atomic field
//! write. Unextractable input and failed extraction are recorded states,
//! not aborts, and a batch re-extraction run isolates each document's
//! failure from the others.

use crate::{
    extract::Extractor,
    normalize::{normalize, NormalizeError, NormalizedText},
    providers::db::{sqlite::SqliteProvider, StorageError},
    types::{Document, NewDocument},
};
use futures::StreamExt;
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Bounded parallelism for batch extraction runs; each document's extraction
/// is independent.
pub const DEFAULT_EXTRACTION_CONCURRENCY: usize = 4;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Storage error during ingestion: {0}")]
    Storage(#[from] StorageError),
}

/// How one document's extraction ended. Only `Extracted` mutates the stored
/// field set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionStatus {
    Extracted,
    /// The input was empty or not text; the document exists with no content.
    Unextractable,
    /// The extraction calls failed after retry; previously stored fields are
    /// unchanged. The message is safe to show to the caller.
    Failed(String),
}

#[derive(Debug)]
pub struct IngestOutcome {
    pub document: Document,
    pub status: ExtractionStatus,
}

/// Ingests one upload end to end.
///
/// The document row is created (or replaced, for a re-upload of the same
/// filename) before extraction runs, so a failed extraction still leaves a
/// visible, retryable document with empty extracted fields.
#[instrument(skip(store, extractor, raw_text))]
pub async fn ingest_document(
    store: &SqliteProvider,
    extractor: &Extractor,
    raw_text: &str,
    filename: &str,
) -> Result<IngestOutcome, IngestError> {
    let content_hash = format!("{:x}", md5::compute(raw_text.as_bytes()));

    let normalized = match normalize(raw_text) {
        Ok(normalized) => normalized,
        Err(NormalizeError::Unextractable) => {
            warn!("Input for '{filename}' is unextractable; storing an empty document.");
            let document = store
                .upsert_document(&NewDocument {
                    filename: filename.to_string(),
                    normalized_text: String::new(),
                    markdown: String::new(),
                    content_hash,
                })
                .await?;
            return Ok(IngestOutcome {
                document,
                status: ExtractionStatus::Unextractable,
            });
        }
    };

    let document = store
        .upsert_document(&NewDocument {
            filename: filename.to_string(),
            normalized_text: normalized.text.clone(),
            markdown: normalized.markdown.clone(),
            content_hash,
        })
        .await?;

    run_extraction(store, extractor, document, &normalized).await
}

/// Re-runs extraction for an already-ingested document from its stored
/// normalized text. Idempotent in effect: a success overwrites the whole
/// field set, a failure changes nothing.
pub async fn extract_document(
    store: &SqliteProvider,
    extractor: &Extractor,
    document_id: &str,
) -> Result<IngestOutcome, IngestError> {
    let document = store.get_document(document_id).await?;
    if document.normalized_text.trim().is_empty() {
        return Ok(IngestOutcome {
            document,
            status: ExtractionStatus::Unextractable,
        });
    }
    let normalized = NormalizedText {
        text: document.normalized_text.clone(),
        markdown: document.markdown.clone(),
    };
    run_extraction(store, extractor, document, &normalized).await
}

/// Extraction over many documents with a bounded worker pool. One document's
/// failure never aborts the run; results arrive in completion order.
pub async fn extract_documents(
    store: &SqliteProvider,
    extractor: &Extractor,
    document_ids: &[String],
    concurrency: usize,
) -> Vec<(String, ExtractionStatus)> {
    let concurrency = concurrency.max(1);
    futures::stream::iter(document_ids.iter().cloned().map(|id| async move {
        let status = match extract_document(store, extractor, &id).await {
            Ok(outcome) => outcome.status,
            Err(e) => ExtractionStatus::Failed(e.to_string()),
        };
        (id, status)
    }))
    .buffer_unordered(concurrency)
    .collect()
    .await
}

async fn run_extraction(
    store: &SqliteProvider,
    extractor: &Extractor,
    document: Document,
    normalized: &NormalizedText,
) -> Result<IngestOutcome, IngestError> {
    match extractor.extract(normalized).await {
        Ok(fields) => {
            let document = store.apply_extraction(&document.id, &fields).await?;
            info!("Extraction complete for document {}", document.id);
            Ok(IngestOutcome {
                document,
                status: ExtractionStatus::Extracted,
            })
        }
        Err(e) => {
            warn!(
                "Extraction failed for document {}: {e}. Stored fields left unchanged.",
                document.id
            );
            Ok(IngestOutcome {
                document,
                status: ExtractionStatus::Failed(e.to_string()),
            })
        }
    }
}
