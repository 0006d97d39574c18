//! # Batch Organizer Tests
//!
//! Membership uniqueness, addition-time ordering, NotFound signalling, and
//! the cascade rules between batches, documents, and conversations.

mod common;

use common::{extraction_mock, memory_store, setup_tracing};
use paperchat::batch;
use paperchat::extract::Extractor;
use paperchat::ingest::ingest_document;
use paperchat::providers::db::StorageError;
use paperchat::types::TargetRef;

async fn ingest(store: &paperchat::providers::db::sqlite::SqliteProvider, name: &str) -> String {
    let extractor = Extractor::new(Box::new(extraction_mock("T", "F")));
    ingest_document(store, &extractor, "Some paper text for the batch tests.", name)
        .await
        .unwrap()
        .document
        .id
}

#[tokio::test]
async fn test_create_and_list_batches() {
    setup_tracing();
    let store = memory_store().await;
    let lit = batch::create_batch(&store, "Lit Review").await.unwrap();
    batch::create_batch(&store, "Methods").await.unwrap();

    let batches = batch::list_batches(&store).await.unwrap();
    assert_eq!(batches.len(), 2);
    assert_eq!(batch::get_batch(&store, &lit.id).await.unwrap().name, "Lit Review");
}

#[tokio::test]
async fn test_membership_is_unique() {
    setup_tracing();
    let store = memory_store().await;
    let b = batch::create_batch(&store, "Lit Review").await.unwrap();
    let d = ingest(&store, "a.pdf").await;

    assert!(batch::add_document(&store, &b.id, &d).await.unwrap());
    // The duplicate add is a no-op.
    assert!(!batch::add_document(&store, &b.id, &d).await.unwrap());

    let memberships = batch::list_memberships(&store, &b.id).await.unwrap();
    assert_eq!(memberships.len(), 1);
    let documents = batch::list_documents(&store, &b.id).await.unwrap();
    assert_eq!(documents.len(), 1);
}

#[tokio::test]
async fn test_documents_are_listed_in_addition_order() {
    setup_tracing();
    let store = memory_store().await;
    let b = batch::create_batch(&store, "Ordered").await.unwrap();
    let first = ingest(&store, "first.pdf").await;
    let second = ingest(&store, "second.pdf").await;
    let third = ingest(&store, "third.pdf").await;

    // Added out of ingestion order on purpose.
    batch::add_document(&store, &b.id, &second).await.unwrap();
    batch::add_document(&store, &b.id, &third).await.unwrap();
    batch::add_document(&store, &b.id, &first).await.unwrap();

    let listed: Vec<String> = batch::list_documents(&store, &b.id)
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.id)
        .collect();
    assert_eq!(listed, vec![second, third, first]);
}

#[tokio::test]
async fn test_missing_ids_signal_not_found() {
    setup_tracing();
    let store = memory_store().await;
    let b = batch::create_batch(&store, "Lit Review").await.unwrap();
    let d = ingest(&store, "a.pdf").await;

    let err = batch::add_document(&store, &b.id, "missing").await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
    let err = batch::add_document(&store, "missing", &d).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
    let err = batch::list_documents(&store, "missing").await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
}

#[tokio::test]
async fn test_remove_document_keeps_batch_and_document() {
    setup_tracing();
    let store = memory_store().await;
    let b = batch::create_batch(&store, "Lit Review").await.unwrap();
    let d = ingest(&store, "a.pdf").await;
    batch::add_document(&store, &b.id, &d).await.unwrap();

    batch::remove_document(&store, &b.id, &d).await.unwrap();
    assert!(batch::list_documents(&store, &b.id).await.unwrap().is_empty());
    // Both sides survive; only the membership is gone.
    assert!(batch::get_batch(&store, &b.id).await.is_ok());
    assert!(store.get_document(&d).await.is_ok());

    // Removing a non-member is a no-op, not an error.
    batch::remove_document(&store, &b.id, &d).await.unwrap();
}

#[tokio::test]
async fn test_delete_batch_cascades_memberships_and_conversation_only() {
    setup_tracing();
    let store = memory_store().await;
    let b = batch::create_batch(&store, "Doomed").await.unwrap();
    let d = ingest(&store, "a.pdf").await;
    batch::add_document(&store, &b.id, &d).await.unwrap();
    let conversation = store
        .open_conversation(&TargetRef::Batch(b.id.clone()))
        .await
        .unwrap();

    batch::delete_batch(&store, &b.id).await.unwrap();

    assert!(matches!(
        batch::get_batch(&store, &b.id).await.unwrap_err(),
        StorageError::NotFound { .. }
    ));
    // The member document is untouched; the batch conversation is gone.
    assert!(store.get_document(&d).await.is_ok());
    assert!(matches!(
        store.get_conversation(&conversation.id).await.unwrap_err(),
        StorageError::NotFound { .. }
    ));
}

#[tokio::test]
async fn test_delete_search_cascades_papers_and_their_conversations() {
    setup_tracing();
    let store = memory_store().await;
    let search = store.create_search("machine learning").await.unwrap();
    let paper = store
        .add_paper(
            &search.id,
            &paperchat::NewPaper {
                title: "A Paper".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let conversation = store
        .open_conversation(&TargetRef::Paper(paper.id.clone()))
        .await
        .unwrap();

    store.delete_search(&search.id).await.unwrap();

    // The search owns its papers: both the paper and the conversation
    // grounded in it are gone.
    assert!(matches!(
        store.get_paper(&paper.id).await.unwrap_err(),
        StorageError::NotFound { .. }
    ));
    assert!(matches!(
        store.get_conversation(&conversation.id).await.unwrap_err(),
        StorageError::NotFound { .. }
    ));
}

#[tokio::test]
async fn test_delete_document_cascades_memberships_and_conversations() {
    setup_tracing();
    let store = memory_store().await;
    let b = batch::create_batch(&store, "Keeps Living").await.unwrap();
    let d = ingest(&store, "a.pdf").await;
    batch::add_document(&store, &b.id, &d).await.unwrap();
    let conversation = store
        .open_conversation(&TargetRef::Document(d.clone()))
        .await
        .unwrap();
    store
        .append_turn(&conversation.id, paperchat::Role::User, "hello?")
        .await
        .unwrap();

    store.delete_document(&d).await.unwrap();

    assert!(matches!(
        store.get_document(&d).await.unwrap_err(),
        StorageError::NotFound { .. }
    ));
    assert!(batch::list_documents(&store, &b.id).await.unwrap().is_empty());
    assert!(matches!(
        store.get_conversation(&conversation.id).await.unwrap_err(),
        StorageError::NotFound { .. }
    ));
    // The batch itself survives.
    assert!(batch::get_batch(&store, &b.id).await.is_ok());
}
