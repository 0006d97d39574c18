pub mod sqlite;

use thiserror::Error;

/// Errors surfaced by the storage collaborator.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage connection failed: {0}")]
    Connection(String),
    #[error("Database error: {0}")]
    Database(#[from] turso::Error),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("Failed to convert database value: expected {0}")]
    TypeConversion(&'static str),
    #[error("Failed to encode stored value: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl StorageError {
    pub fn not_found(entity: &'static str, id: &str) -> Self {
        StorageError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}
