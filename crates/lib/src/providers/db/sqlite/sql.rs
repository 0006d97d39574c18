//! # SQLite Schema
//!
//! Centralized DDL for the core's own entities. Statements are idempotent
//! (`IF NOT EXISTS`) and safe to run on every startup.

pub const ALL_TABLE_CREATION_SQL: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS documents (
        id TEXT PRIMARY KEY,
        filename TEXT NOT NULL,
        title TEXT NOT NULL,
        authors TEXT NOT NULL DEFAULT '[]',
        year INTEGER,
        doi TEXT,
        normalized_text TEXT NOT NULL,
        markdown TEXT NOT NULL,
        content_hash TEXT NOT NULL,
        background TEXT,
        research_question TEXT,
        major_findings TEXT,
        suggestions TEXT,
        extracted_at TEXT,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS batches (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS batch_documents (
        batch_id TEXT NOT NULL,
        document_id TEXT NOT NULL,
        added_at TEXT NOT NULL
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_batch_documents_pair
        ON batch_documents (batch_id, document_id)",
    "CREATE TABLE IF NOT EXISTS searches (
        id TEXT PRIMARY KEY,
        query TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS papers (
        id TEXT PRIMARY KEY,
        search_id TEXT NOT NULL,
        title TEXT NOT NULL,
        authors TEXT NOT NULL DEFAULT '[]',
        year INTEGER,
        doi TEXT,
        abstract_text TEXT,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_papers_search ON papers (search_id)",
    "CREATE TABLE IF NOT EXISTS conversations (
        id TEXT PRIMARY KEY,
        target_kind TEXT NOT NULL,
        target_id TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_conversations_target
        ON conversations (target_kind, target_id)",
    "CREATE TABLE IF NOT EXISTS turns (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        conversation_id TEXT NOT NULL,
        role TEXT NOT NULL,
        content TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_turns_conversation ON turns (conversation_id)",
    "CREATE TABLE IF NOT EXISTS model_configs (
        id TEXT PRIMARY KEY,
        provider TEXT NOT NULL,
        api_key TEXT,
        base_url TEXT,
        model_name TEXT NOT NULL,
        is_default INTEGER NOT NULL DEFAULT 0,
        updated_at TEXT NOT NULL
    )",
];
