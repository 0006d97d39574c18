//! # SQLite Storage Provider
//!
//! The storage collaborator for the core's own entities: documents, batches,
//! searches and papers, conversations and turns, and model configurations.
//! Built on Turso; a `Database` instance manages the connection pool, so a
//! cloned provider shares the same underlying database.

use crate::{
    providers::db::StorageError,
    types::{
        Conversation, Document, ExtractedFields, ModelConfig, NewDocument, NewModelConfig,
        NewPaper, Paper, Role, Search, TargetRef, Turn,
    },
};
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, info};
use turso::{params, Database, Value as TursoValue};
use uuid::Uuid;

pub mod sql;

/// Column list shared by every document query so row mapping stays in one
/// place.
pub(crate) const DOCUMENT_COLUMNS: &str = "id, filename, title, authors, year, doi, \
     normalized_text, markdown, content_hash, background, research_question, \
     major_findings, suggestions, extracted_at, created_at";

/// A provider for interacting with a local SQLite database using Turso.
#[derive(Clone)]
pub struct SqliteProvider {
    /// The Turso database instance. It's cloneable and thread-safe.
    pub db: Database,
}

impl SqliteProvider {
    /// Creates a new `SqliteProvider` from a file path or in-memory.
    ///
    /// Use ":memory:" for a unique, isolated in-memory database. To share an
    /// in-memory database across provider instances (e.g., in tests), create
    /// one provider and then `.clone()` it.
    pub async fn new(db_path: &str) -> Result<Self, StorageError> {
        let db = turso::Builder::new_local(db_path)
            .build()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        // WAL improves concurrency for file-based databases and is a no-op
        // in memory. PRAGMA returns a row, so `query` is required here.
        let conn = db
            .connect()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        conn.query("PRAGMA journal_mode=WAL;", ())
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(Self { db })
    }

    /// Ensures that all required tables and indexes exist. Idempotent and
    /// safe to call on every startup.
    pub async fn initialize_schema(&self) -> Result<(), StorageError> {
        let conn = self.connect()?;
        for statement in sql::ALL_TABLE_CREATION_SQL {
            conn.execute(statement, ()).await?;
        }
        Ok(())
    }

    /// A helper for tests to pre-populate data by executing multiple SQL
    /// statements.
    pub async fn initialize_with_data(&self, init_sql: &str) -> Result<(), StorageError> {
        let conn = self.connect()?;
        for statement in init_sql.split(';').filter(|s| !s.trim().is_empty()) {
            conn.execute(statement, ()).await?;
        }
        Ok(())
    }

    pub(crate) fn connect(&self) -> Result<turso::Connection, StorageError> {
        self.db
            .connect()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    // --- Documents ---

    /// Creates a document, or replaces its content when the same file is
    /// uploaded again. The id is derived from the filename, so re-ingestion
    /// updates in place; any previously extracted fields are cleared because
    /// they no longer describe the new text.
    pub async fn upsert_document(&self, new: &NewDocument) -> Result<Document, StorageError> {
        let conn = self.connect()?;
        let id = Uuid::new_v5(&Uuid::NAMESPACE_URL, new.filename.as_bytes()).to_string();
        let title = default_title(&new.filename);

        conn.execute(
            "INSERT INTO documents (id, filename, title, authors, year, doi, normalized_text, \
             markdown, content_hash, created_at) VALUES (?, ?, ?, '[]', NULL, NULL, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 normalized_text = excluded.normalized_text,
                 markdown = excluded.markdown,
                 content_hash = excluded.content_hash,
                 title = excluded.title,
                 authors = '[]',
                 year = NULL,
                 doi = NULL,
                 background = NULL,
                 research_question = NULL,
                 major_findings = NULL,
                 suggestions = NULL,
                 extracted_at = NULL",
            params![
                id.clone(),
                new.filename.clone(),
                title,
                new.normalized_text.clone(),
                new.markdown.clone(),
                new.content_hash.clone(),
                format_timestamp(&Utc::now())
            ],
        )
        .await?;

        info!("Stored document '{}' as {}", new.filename, id);
        self.get_document(&id).await
    }

    pub async fn get_document(&self, id: &str) -> Result<Document, StorageError> {
        let conn = self.connect()?;
        let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?");
        let mut rows = conn.query(&sql, params![id]).await?;
        match rows.next().await? {
            Some(row) => document_from_row(&row),
            None => Err(StorageError::not_found("Document", id)),
        }
    }

    pub async fn list_documents(&self) -> Result<Vec<Document>, StorageError> {
        let conn = self.connect()?;
        let sql =
            format!("SELECT {DOCUMENT_COLUMNS} FROM documents ORDER BY created_at, filename");
        let mut rows = conn.query(&sql, ()).await?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next().await? {
            documents.push(document_from_row(&row)?);
        }
        Ok(documents)
    }

    /// Writes the complete extracted field set in a single statement.
    ///
    /// This is the only path that mutates extraction output, so a document is
    /// only ever observed with the whole set present or absent; a failed
    /// extraction run leaves the previous state untouched.
    pub async fn apply_extraction(
        &self,
        id: &str,
        fields: &ExtractedFields,
    ) -> Result<Document, StorageError> {
        let existing = self.get_document(id).await?;
        let title = if fields.title.trim().is_empty() {
            existing.title
        } else {
            fields.title.trim().to_string()
        };
        let authors = serde_json::to_string(&fields.authors)?;

        let conn = self.connect()?;
        conn.execute(
            "UPDATE documents SET title = ?, authors = ?, year = ?, doi = ?, background = ?, \
             research_question = ?, major_findings = ?, suggestions = ?, extracted_at = ? \
             WHERE id = ?",
            params![
                title,
                authors,
                fields.year,
                fields.doi.clone(),
                fields.background.clone(),
                fields.research_question.clone(),
                fields.major_findings.clone(),
                fields.suggestions.clone(),
                format_timestamp(&Utc::now()),
                id
            ],
        )
        .await?;

        debug!("Applied extraction output to document {id}");
        self.get_document(id).await
    }

    /// Deletes a document, cascading to its batch memberships and its
    /// conversations. Batches themselves are never deleted here.
    pub async fn delete_document(&self, id: &str) -> Result<(), StorageError> {
        // Existence check up front so callers get NotFound, not a no-op.
        self.get_document(id).await?;

        let conn = self.connect()?;
        conn.execute("BEGIN TRANSACTION", ()).await?;
        conn.execute(
            "DELETE FROM turns WHERE conversation_id IN \
             (SELECT id FROM conversations WHERE target_kind = 'document' AND target_id = ?)",
            params![id],
        )
        .await?;
        conn.execute(
            "DELETE FROM conversations WHERE target_kind = 'document' AND target_id = ?",
            params![id],
        )
        .await?;
        conn.execute(
            "DELETE FROM batch_documents WHERE document_id = ?",
            params![id],
        )
        .await?;
        conn.execute("DELETE FROM documents WHERE id = ?", params![id])
            .await?;
        conn.execute("COMMIT", ()).await?;

        info!("Deleted document {id} with memberships and conversations");
        Ok(())
    }

    // --- Searches and papers ---

    pub async fn create_search(&self, query: &str) -> Result<Search, StorageError> {
        let conn = self.connect()?;
        let search = Search {
            id: Uuid::new_v4().to_string(),
            query: query.to_string(),
            created_at: Utc::now(),
        };
        conn.execute(
            "INSERT INTO searches (id, query, created_at) VALUES (?, ?, ?)",
            params![
                search.id.clone(),
                search.query.clone(),
                format_timestamp(&search.created_at)
            ],
        )
        .await?;
        Ok(search)
    }

    /// Attaches a catalog result to a search. Field population is done by the
    /// external search collaborator; the core only records it.
    pub async fn add_paper(
        &self,
        search_id: &str,
        new: &NewPaper,
    ) -> Result<Paper, StorageError> {
        if !self.exists("searches", search_id).await? {
            return Err(StorageError::not_found("Search", search_id));
        }
        let conn = self.connect()?;
        let paper = Paper {
            id: Uuid::new_v4().to_string(),
            search_id: search_id.to_string(),
            title: new.title.clone(),
            authors: new.authors.clone(),
            year: new.year,
            doi: new.doi.clone(),
            abstract_text: new.abstract_text.clone(),
            created_at: Utc::now(),
        };
        conn.execute(
            "INSERT INTO papers (id, search_id, title, authors, year, doi, abstract_text, \
             created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                paper.id.clone(),
                paper.search_id.clone(),
                paper.title.clone(),
                serde_json::to_string(&paper.authors)?,
                paper.year,
                paper.doi.clone(),
                paper.abstract_text.clone(),
                format_timestamp(&paper.created_at)
            ],
        )
        .await?;
        Ok(paper)
    }

    pub async fn get_paper(&self, id: &str) -> Result<Paper, StorageError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT id, search_id, title, authors, year, doi, abstract_text, created_at \
                 FROM papers WHERE id = ?",
                params![id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => paper_from_row(&row),
            None => Err(StorageError::not_found("Paper", id)),
        }
    }

    pub async fn list_papers(&self, search_id: &str) -> Result<Vec<Paper>, StorageError> {
        if !self.exists("searches", search_id).await? {
            return Err(StorageError::not_found("Search", search_id));
        }
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT id, search_id, title, authors, year, doi, abstract_text, created_at \
                 FROM papers WHERE search_id = ? ORDER BY created_at, rowid",
                params![search_id],
            )
            .await?;
        let mut papers = Vec::new();
        while let Some(row) = rows.next().await? {
            papers.push(paper_from_row(&row)?);
        }
        Ok(papers)
    }

    /// Deletes a search and, because a search owns its papers, every attached
    /// paper and the conversations grounded in them.
    pub async fn delete_search(&self, id: &str) -> Result<(), StorageError> {
        if !self.exists("searches", id).await? {
            return Err(StorageError::not_found("Search", id));
        }
        let conn = self.connect()?;
        conn.execute("BEGIN TRANSACTION", ()).await?;
        conn.execute(
            "DELETE FROM turns WHERE conversation_id IN \
             (SELECT id FROM conversations WHERE target_kind = 'paper' AND target_id IN \
                 (SELECT id FROM papers WHERE search_id = ?))",
            params![id],
        )
        .await?;
        conn.execute(
            "DELETE FROM conversations WHERE target_kind = 'paper' AND target_id IN \
             (SELECT id FROM papers WHERE search_id = ?)",
            params![id],
        )
        .await?;
        conn.execute("DELETE FROM papers WHERE search_id = ?", params![id])
            .await?;
        conn.execute("DELETE FROM searches WHERE id = ?", params![id])
            .await?;
        conn.execute("COMMIT", ()).await?;
        Ok(())
    }

    // --- Conversations and turns ---

    /// Returns the conversation for a target, creating it on first use. The
    /// target itself must exist; a conversation is never a dangling pointer
    /// at creation time.
    pub async fn open_conversation(
        &self,
        target: &TargetRef,
    ) -> Result<Conversation, StorageError> {
        match target {
            TargetRef::Document(id) => {
                if !self.exists("documents", id).await? {
                    return Err(StorageError::not_found("Document", id));
                }
            }
            TargetRef::Paper(id) => {
                if !self.exists("papers", id).await? {
                    return Err(StorageError::not_found("Paper", id));
                }
            }
            TargetRef::Batch(id) => {
                if !self.exists("batches", id).await? {
                    return Err(StorageError::not_found("Batch", id));
                }
            }
            TargetRef::AdHoc(_) => {}
        }

        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT id, target_kind, target_id, created_at FROM conversations \
                 WHERE target_kind = ? AND target_id = ?",
                params![target.kind(), target.target_id()],
            )
            .await?;
        if let Some(row) = rows.next().await? {
            return conversation_from_row(&row);
        }

        let conversation = Conversation {
            id: Uuid::new_v4().to_string(),
            target: target.clone(),
            created_at: Utc::now(),
        };
        conn.execute(
            "INSERT INTO conversations (id, target_kind, target_id, created_at) \
             VALUES (?, ?, ?, ?)",
            params![
                conversation.id.clone(),
                target.kind(),
                target.target_id(),
                format_timestamp(&conversation.created_at)
            ],
        )
        .await?;
        Ok(conversation)
    }

    pub async fn get_conversation(&self, id: &str) -> Result<Conversation, StorageError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT id, target_kind, target_id, created_at FROM conversations WHERE id = ?",
                params![id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => conversation_from_row(&row),
            None => Err(StorageError::not_found("Conversation", id)),
        }
    }

    pub async fn delete_conversation(&self, id: &str) -> Result<(), StorageError> {
        self.get_conversation(id).await?;
        let conn = self.connect()?;
        conn.execute("BEGIN TRANSACTION", ()).await?;
        conn.execute("DELETE FROM turns WHERE conversation_id = ?", params![id])
            .await?;
        conn.execute("DELETE FROM conversations WHERE id = ?", params![id])
            .await?;
        conn.execute("COMMIT", ()).await?;
        Ok(())
    }

    /// Turns in creation order (insertion order breaks timestamp ties).
    pub async fn list_turns(&self, conversation_id: &str) -> Result<Vec<Turn>, StorageError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT id, role, content, created_at FROM turns \
                 WHERE conversation_id = ? ORDER BY created_at, id",
                params![conversation_id],
            )
            .await?;
        let mut turns = Vec::new();
        while let Some(row) = rows.next().await? {
            turns.push(turn_from_row(&row)?);
        }
        Ok(turns)
    }

    pub async fn last_turn(&self, conversation_id: &str) -> Result<Option<Turn>, StorageError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT id, role, content, created_at FROM turns \
                 WHERE conversation_id = ? ORDER BY created_at DESC, id DESC LIMIT 1",
                params![conversation_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(turn_from_row(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn append_turn(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str,
    ) -> Result<Turn, StorageError> {
        self.get_conversation(conversation_id).await?;
        let conn = self.connect()?;
        let created_at = Utc::now();
        conn.execute(
            "INSERT INTO turns (conversation_id, role, content, created_at) VALUES (?, ?, ?, ?)",
            params![
                conversation_id,
                role.as_str(),
                content,
                format_timestamp(&created_at)
            ],
        )
        .await?;

        let mut rows = conn.query("SELECT last_insert_rowid()", ()).await?;
        let id = match rows.next().await? {
            Some(row) => row_int(&row, 0)?,
            None => return Err(StorageError::TypeConversion("rowid")),
        };

        Ok(Turn {
            id,
            role,
            content: content.to_string(),
            created_at,
        })
    }

    /// Rewrites one turn's content. Used to coalesce consecutive same-role
    /// user turns instead of storing them out of order.
    pub async fn update_turn_content(
        &self,
        turn_id: i64,
        content: &str,
    ) -> Result<(), StorageError> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE turns SET content = ? WHERE id = ?",
            params![content, turn_id],
        )
        .await?;
        Ok(())
    }

    // --- Model configurations ---

    pub async fn save_model_config(
        &self,
        new: &NewModelConfig,
    ) -> Result<ModelConfig, StorageError> {
        let conn = self.connect()?;
        let config = ModelConfig {
            id: Uuid::new_v4().to_string(),
            provider: new.provider.clone(),
            api_key: new.api_key.clone(),
            base_url: new.base_url.clone(),
            model_name: new.model_name.clone(),
            is_default: false,
            updated_at: Utc::now(),
        };
        conn.execute(
            "INSERT INTO model_configs (id, provider, api_key, base_url, model_name, \
             is_default, updated_at) VALUES (?, ?, ?, ?, ?, 0, ?)",
            params![
                config.id.clone(),
                config.provider.clone(),
                config.api_key.clone(),
                config.base_url.clone(),
                config.model_name.clone(),
                format_timestamp(&config.updated_at)
            ],
        )
        .await?;
        Ok(config)
    }

    pub async fn get_model_config(&self, id: &str) -> Result<ModelConfig, StorageError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT id, provider, api_key, base_url, model_name, is_default, updated_at \
                 FROM model_configs WHERE id = ?",
                params![id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => model_config_from_row(&row),
            None => Err(StorageError::not_found("ModelConfig", id)),
        }
    }

    pub async fn list_model_configs(&self) -> Result<Vec<ModelConfig>, StorageError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT id, provider, api_key, base_url, model_name, is_default, updated_at \
                 FROM model_configs ORDER BY updated_at, id",
                (),
            )
            .await?;
        let mut configs = Vec::new();
        while let Some(row) = rows.next().await? {
            configs.push(model_config_from_row(&row)?);
        }
        Ok(configs)
    }

    pub async fn get_default_model_config(&self) -> Result<Option<ModelConfig>, StorageError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT id, provider, api_key, base_url, model_name, is_default, updated_at \
                 FROM model_configs WHERE is_default = 1 LIMIT 1",
                (),
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(model_config_from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Flips the default flag to the given config in one transaction:
    /// clearing the previous default and setting the new one are never
    /// observable separately.
    pub async fn set_default_model_config(
        &self,
        id: &str,
    ) -> Result<ModelConfig, StorageError> {
        self.get_model_config(id).await?;
        let conn = self.connect()?;
        conn.execute("BEGIN TRANSACTION", ()).await?;
        conn.execute(
            "UPDATE model_configs SET is_default = 0 WHERE is_default = 1",
            (),
        )
        .await?;
        conn.execute(
            "UPDATE model_configs SET is_default = 1, updated_at = ? WHERE id = ?",
            params![format_timestamp(&Utc::now()), id],
        )
        .await?;
        conn.execute("COMMIT", ()).await?;
        info!("Model config {id} is now the default");
        self.get_model_config(id).await
    }

    // --- Shared helpers ---

    /// Existence probe for id-keyed tables. The table name is always a
    /// compile-time constant.
    pub(crate) async fn exists(
        &self,
        table: &'static str,
        id: &str,
    ) -> Result<bool, StorageError> {
        let conn = self.connect()?;
        let sql = format!("SELECT 1 FROM {table} WHERE id = ? LIMIT 1");
        let mut rows = conn.query(&sql, params![id]).await?;
        Ok(rows.next().await?.is_some())
    }
}

impl std::fmt::Debug for SqliteProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteProvider").finish_non_exhaustive()
    }
}

// --- Row mapping ---

pub(crate) fn row_text(row: &turso::Row, idx: usize) -> Result<String, StorageError> {
    match row.get_value(idx)? {
        TursoValue::Text(s) => Ok(s),
        _ => Err(StorageError::TypeConversion("text")),
    }
}

pub(crate) fn row_opt_text(row: &turso::Row, idx: usize) -> Result<Option<String>, StorageError> {
    match row.get_value(idx)? {
        TursoValue::Text(s) => Ok(Some(s)),
        TursoValue::Null => Ok(None),
        _ => Err(StorageError::TypeConversion("text or null")),
    }
}

pub(crate) fn row_int(row: &turso::Row, idx: usize) -> Result<i64, StorageError> {
    match row.get_value(idx)? {
        TursoValue::Integer(i) => Ok(i),
        _ => Err(StorageError::TypeConversion("integer")),
    }
}

pub(crate) fn row_opt_int(row: &turso::Row, idx: usize) -> Result<Option<i64>, StorageError> {
    match row.get_value(idx)? {
        TursoValue::Integer(i) => Ok(Some(i)),
        TursoValue::Null => Ok(None),
        _ => Err(StorageError::TypeConversion("integer or null")),
    }
}

/// Fixed-width RFC 3339 (microseconds, `Z`) so lexicographic order in SQL
/// matches chronological order.
pub(crate) fn format_timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|_| StorageError::TypeConversion("rfc3339 timestamp"))
}

fn parse_authors(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

/// Maps a `SELECT {DOCUMENT_COLUMNS}` row.
pub(crate) fn document_from_row(row: &turso::Row) -> Result<Document, StorageError> {
    let title = row_text(row, 2)?;
    let authors = parse_authors(&row_text(row, 3)?);
    let year = row_opt_int(row, 4)?;
    let doi = row_opt_text(row, 5)?;

    let extraction = match row_opt_text(row, 13)? {
        Some(_) => Some(ExtractedFields {
            title: title.clone(),
            authors: authors.clone(),
            year,
            doi: doi.clone(),
            background: row_opt_text(row, 9)?.unwrap_or_default(),
            research_question: row_opt_text(row, 10)?.unwrap_or_default(),
            major_findings: row_opt_text(row, 11)?.unwrap_or_default(),
            suggestions: row_opt_text(row, 12)?.unwrap_or_default(),
        }),
        None => None,
    };

    Ok(Document {
        id: row_text(row, 0)?,
        filename: row_text(row, 1)?,
        title,
        authors,
        year,
        doi,
        normalized_text: row_text(row, 6)?,
        markdown: row_text(row, 7)?,
        content_hash: row_text(row, 8)?,
        extraction,
        created_at: parse_timestamp(&row_text(row, 14)?)?,
    })
}

fn paper_from_row(row: &turso::Row) -> Result<Paper, StorageError> {
    Ok(Paper {
        id: row_text(row, 0)?,
        search_id: row_text(row, 1)?,
        title: row_text(row, 2)?,
        authors: parse_authors(&row_text(row, 3)?),
        year: row_opt_int(row, 4)?,
        doi: row_opt_text(row, 5)?,
        abstract_text: row_opt_text(row, 6)?,
        created_at: parse_timestamp(&row_text(row, 7)?)?,
    })
}

fn conversation_from_row(row: &turso::Row) -> Result<Conversation, StorageError> {
    let kind = row_text(row, 1)?;
    let target_id = row_text(row, 2)?;
    let target = TargetRef::from_parts(&kind, &target_id)
        .ok_or(StorageError::TypeConversion("conversation target kind"))?;
    Ok(Conversation {
        id: row_text(row, 0)?,
        target,
        created_at: parse_timestamp(&row_text(row, 3)?)?,
    })
}

fn turn_from_row(row: &turso::Row) -> Result<Turn, StorageError> {
    let role = row_text(row, 1)?;
    Ok(Turn {
        id: row_int(row, 0)?,
        role: Role::from_str(&role).ok_or(StorageError::TypeConversion("turn role"))?,
        content: row_text(row, 2)?,
        created_at: parse_timestamp(&row_text(row, 3)?)?,
    })
}

fn model_config_from_row(row: &turso::Row) -> Result<ModelConfig, StorageError> {
    Ok(ModelConfig {
        id: row_text(row, 0)?,
        provider: row_text(row, 1)?,
        api_key: row_opt_text(row, 2)?,
        base_url: row_opt_text(row, 3)?,
        model_name: row_text(row, 4)?,
        is_default: row_int(row, 5)? != 0,
        updated_at: parse_timestamp(&row_text(row, 6)?)?,
    })
}

/// Filename without its extension, used as the provisional document title
/// until extraction finds the real one.
fn default_title(filename: &str) -> String {
    let stem = filename.rsplit_once('.').map_or(filename, |(stem, _)| stem);
    if stem.is_empty() {
        filename.to_string()
    } else {
        stem.to_string()
    }
}
