//! # PDF Source Integration Tests

use anyhow::Result;
use paperchat::extract::Extractor;
use paperchat::ingest::ExtractionStatus;
use paperchat_pdf::{ingest_pdf, pdf_to_text};
use paperchat_test_utils::{helpers::generate_test_pdf, MockAiProvider, TestSetup};
use serde_json::json;

fn programmed_mock() -> MockAiProvider {
    let mock = MockAiProvider::new();
    mock.add_response(
        "bibliographic data extraction agent",
        &json!({
            "title": "The Magic Number",
            "authors": ["D. Adams"],
            "year": 1979,
            "doi": null
        })
        .to_string(),
    );
    mock.add_response(
        "expert research analyst",
        &json!({
            "background": "Numerology in computing.",
            "research_question": "Which number is magic?",
            "major_findings": "The magic number is 42.",
            "suggestions": "Check other numbers."
        })
        .to_string(),
    );
    mock
}

#[tokio::test]
async fn test_pdf_text_extraction() -> Result<()> {
    let pdf_data = generate_test_pdf("The magic number is 42.")?;
    let text = pdf_to_text(pdf_data).await?;
    assert!(text.contains("magic number"), "got: {text}");
    Ok(())
}

#[tokio::test]
async fn test_pdf_ingestion_workflow() -> Result<()> {
    let setup = TestSetup::new().await?;
    let extractor = Extractor::new(Box::new(programmed_mock()));
    let pdf_data = generate_test_pdf("The magic number is 42. Everyone agrees on this.")?;

    let outcome = ingest_pdf(&setup.store, &extractor, pdf_data, "magic.pdf").await?;
    assert_eq!(outcome.status, ExtractionStatus::Extracted);

    let stored = setup.store.get_document(&outcome.document.id).await?;
    assert_eq!(stored.filename, "magic.pdf");
    assert_eq!(stored.title, "The Magic Number");
    assert!(stored.normalized_text.contains("magic number"));
    let fields = stored.extraction.expect("extraction should be present");
    assert_eq!(fields.major_findings, "The magic number is 42.");
    Ok(())
}

#[tokio::test]
async fn test_unparsable_pdf_is_recorded_as_unextractable() -> Result<()> {
    let setup = TestSetup::new().await?;
    let extractor = Extractor::new(Box::new(MockAiProvider::new()));

    let outcome = ingest_pdf(
        &setup.store,
        &extractor,
        b"this is not a pdf at all".to_vec(),
        "broken.pdf",
    )
    .await?;
    assert_eq!(outcome.status, ExtractionStatus::Unextractable);

    // The upload is still visible as a document with no content.
    let stored = setup.store.get_document(&outcome.document.id).await?;
    assert!(stored.normalized_text.is_empty());
    assert!(stored.extraction.is_none());
    Ok(())
}
