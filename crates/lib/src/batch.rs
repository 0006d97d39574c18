//! # Batch Organizer
//!
//! Pure relationship bookkeeping: named batches, many-to-many membership
//! between batches and documents, and batch-scoped retrieval. Membership is
//! an explicit join row with a uniqueness constraint, so duplicate
//! prevention and cascade deletes live in one place.

use crate::{
    providers::db::{
        sqlite::{
            document_from_row, format_timestamp, parse_timestamp, row_text, SqliteProvider,
            DOCUMENT_COLUMNS,
        },
        StorageError,
    },
    types::{Batch, Document, Membership},
};
use chrono::Utc;
use tracing::info;
use turso::params;
use uuid::Uuid;

pub async fn create_batch(store: &SqliteProvider, name: &str) -> Result<Batch, StorageError> {
    let conn = store.connect()?;
    let batch = Batch {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        created_at: Utc::now(),
    };
    conn.execute(
        "INSERT INTO batches (id, name, created_at) VALUES (?, ?, ?)",
        params![
            batch.id.clone(),
            batch.name.clone(),
            format_timestamp(&batch.created_at)
        ],
    )
    .await?;
    info!("Created batch '{}' ({})", batch.name, batch.id);
    Ok(batch)
}

pub async fn get_batch(store: &SqliteProvider, id: &str) -> Result<Batch, StorageError> {
    let conn = store.connect()?;
    let mut rows = conn
        .query(
            "SELECT id, name, created_at FROM batches WHERE id = ?",
            params![id],
        )
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Batch {
            id: row_text(&row, 0)?,
            name: row_text(&row, 1)?,
            created_at: parse_timestamp(&row_text(&row, 2)?)?,
        }),
        None => Err(StorageError::not_found("Batch", id)),
    }
}

pub async fn list_batches(store: &SqliteProvider) -> Result<Vec<Batch>, StorageError> {
    let conn = store.connect()?;
    let mut rows = conn
        .query(
            "SELECT id, name, created_at FROM batches ORDER BY created_at, name",
            (),
        )
        .await?;
    let mut batches = Vec::new();
    while let Some(row) = rows.next().await? {
        batches.push(Batch {
            id: row_text(&row, 0)?,
            name: row_text(&row, 1)?,
            created_at: parse_timestamp(&row_text(&row, 2)?)?,
        });
    }
    Ok(batches)
}

/// Adds a document to a batch. Returns `false` when the membership already
/// existed; the insert is `OR IGNORE` over a unique (batch, document) index,
/// so a pair can never appear twice.
pub async fn add_document(
    store: &SqliteProvider,
    batch_id: &str,
    document_id: &str,
) -> Result<bool, StorageError> {
    get_batch(store, batch_id).await?;
    if !store.exists("documents", document_id).await? {
        return Err(StorageError::not_found("Document", document_id));
    }

    let conn = store.connect()?;
    let already_member = conn
        .query(
            "SELECT 1 FROM batch_documents WHERE batch_id = ? AND document_id = ?",
            params![batch_id, document_id],
        )
        .await?
        .next()
        .await?
        .is_some();

    conn.execute(
        "INSERT OR IGNORE INTO batch_documents (batch_id, document_id, added_at) \
         VALUES (?, ?, ?)",
        params![batch_id, document_id, format_timestamp(&Utc::now())],
    )
    .await?;

    Ok(!already_member)
}

/// Removes a membership. Removing a document that is not a member is a
/// no-op, but both ids must exist.
pub async fn remove_document(
    store: &SqliteProvider,
    batch_id: &str,
    document_id: &str,
) -> Result<(), StorageError> {
    get_batch(store, batch_id).await?;
    if !store.exists("documents", document_id).await? {
        return Err(StorageError::not_found("Document", document_id));
    }
    let conn = store.connect()?;
    conn.execute(
        "DELETE FROM batch_documents WHERE batch_id = ? AND document_id = ?",
        params![batch_id, document_id],
    )
    .await?;
    Ok(())
}

/// Member documents in the order they were added to the batch.
pub async fn list_documents(
    store: &SqliteProvider,
    batch_id: &str,
) -> Result<Vec<Document>, StorageError> {
    get_batch(store, batch_id).await?;
    let conn = store.connect()?;
    // No column names collide between the two tables, so the shared document
    // column list can stay unqualified.
    let sql = format!(
        "SELECT {DOCUMENT_COLUMNS} FROM batch_documents bd \
         JOIN documents d ON d.id = bd.document_id \
         WHERE bd.batch_id = ? ORDER BY bd.added_at, bd.rowid"
    );
    let mut rows = conn.query(&sql, params![batch_id]).await?;
    let mut documents = Vec::new();
    while let Some(row) = rows.next().await? {
        documents.push(document_from_row(&row)?);
    }
    Ok(documents)
}

/// Raw membership rows for a batch, in addition order.
pub async fn list_memberships(
    store: &SqliteProvider,
    batch_id: &str,
) -> Result<Vec<Membership>, StorageError> {
    get_batch(store, batch_id).await?;
    let conn = store.connect()?;
    let mut rows = conn
        .query(
            "SELECT batch_id, document_id, added_at FROM batch_documents \
             WHERE batch_id = ? ORDER BY added_at, rowid",
            params![batch_id],
        )
        .await?;
    let mut memberships = Vec::new();
    while let Some(row) = rows.next().await? {
        memberships.push(Membership {
            batch_id: row_text(&row, 0)?,
            document_id: row_text(&row, 1)?,
            added_at: parse_timestamp(&row_text(&row, 2)?)?,
        });
    }
    Ok(memberships)
}

/// Deletes a batch, cascading to its memberships and its conversation. The
/// member documents are untouched.
pub async fn delete_batch(store: &SqliteProvider, id: &str) -> Result<(), StorageError> {
    get_batch(store, id).await?;
    let conn = store.connect()?;
    conn.execute("BEGIN TRANSACTION", ()).await?;
    conn.execute(
        "DELETE FROM turns WHERE conversation_id IN \
         (SELECT id FROM conversations WHERE target_kind = 'batch' AND target_id = ?)",
        params![id],
    )
    .await?;
    conn.execute(
        "DELETE FROM conversations WHERE target_kind = 'batch' AND target_id = ?",
        params![id],
    )
    .await?;
    conn.execute(
        "DELETE FROM batch_documents WHERE batch_id = ?",
        params![id],
    )
    .await?;
    conn.execute("DELETE FROM batches WHERE id = ?", params![id])
        .await?;
    conn.execute("COMMIT", ()).await?;
    info!("Deleted batch {id} and its memberships");
    Ok(())
}
