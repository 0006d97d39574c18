//! # paperchat-pdf: PDF Text Source
//!
//! The upload/extraction-source collaborator for the `paperchat` core: turns
//! raw PDF bytes into decoded text and hands it to the ingestion pipeline.
//! PDF parsing is CPU-intensive, so it runs on a blocking thread. A PDF that
//! cannot be parsed is treated as unextractable input, not a crash.

use paperchat::{
    extract::Extractor, ingest::ingest_document, providers::db::sqlite::SqliteProvider,
    IngestError, IngestOutcome,
};
use pdf::file::FileOptions;
use thiserror::Error;
use tracing::{info, instrument, warn};

// --- Error Definitions ---

#[derive(Error, Debug)]
pub enum PdfSourceError {
    #[error("Failed to parse PDF content: {0}")]
    Parse(String),
    #[error("Ingestion failed: {0}")]
    Ingest(#[from] IngestError),
    #[error("An internal error occurred: {0}")]
    Internal(#[from] anyhow::Error),
}

// --- Text Extraction ---

/// Extracts text from all pages of a PDF on a blocking thread.
pub async fn pdf_to_text(pdf_data: Vec<u8>) -> Result<String, PdfSourceError> {
    let text = tokio::task::spawn_blocking(move || extract_text(&pdf_data))
        .await
        .map_err(|e| {
            PdfSourceError::Internal(anyhow::anyhow!("Join error during PDF parsing: {e}"))
        })??;
    info!(
        "Extracted text from PDF. Total length: {} characters.",
        text.len()
    );
    Ok(text)
}

/// Walks the page content streams collecting text-draw operators.
fn extract_text(pdf_data: &[u8]) -> Result<String, PdfSourceError> {
    let file = FileOptions::cached()
        .load(pdf_data)
        .map_err(|e| PdfSourceError::Parse(e.to_string()))?;
    let resolver = file.resolver();
    let mut full_text = String::new();

    for page_num in 0..file.num_pages() {
        let page = file
            .get_page(page_num)
            .map_err(|e| PdfSourceError::Parse(e.to_string()))?;
        if let Some(content) = &page.contents {
            let operations = content
                .operations(&resolver)
                .map_err(|e| PdfSourceError::Parse(e.to_string()))?;
            for op in operations.iter() {
                match op {
                    pdf::content::Op::TextDraw { text } => {
                        full_text.push_str(&text.to_string_lossy());
                    }
                    pdf::content::Op::TextDrawAdjusted { array } => {
                        for item in array.iter() {
                            if let pdf::content::TextDrawAdjusted::Text(text) = item {
                                full_text.push_str(&text.to_string_lossy());
                            }
                        }
                    }
                    _ => {}
                }
            }
            full_text.push_str("\n\n");
        } else {
            warn!("Page {} has no content stream.", page_num);
        }
    }
    Ok(full_text)
}

// --- Ingestion Entry Point ---

/// Ingests one uploaded PDF end to end: decode → normalize → store →
/// extract. An unparsable PDF is recorded as an unextractable document so
/// the upload stays visible and the rest of a batch continues.
#[instrument(skip(store, extractor, pdf_data))]
pub async fn ingest_pdf(
    store: &SqliteProvider,
    extractor: &Extractor,
    pdf_data: Vec<u8>,
    filename: &str,
) -> Result<IngestOutcome, PdfSourceError> {
    let raw_text = match pdf_to_text(pdf_data).await {
        Ok(text) => text,
        Err(PdfSourceError::Parse(reason)) => {
            warn!("PDF '{filename}' could not be parsed ({reason}); recording as unextractable.");
            String::new()
        }
        Err(other) => return Err(other),
    };

    Ok(ingest_document(store, extractor, &raw_text, filename).await?)
}
