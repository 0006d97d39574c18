//! Core records shared across the pipeline: documents, batches, searches,
//! conversations, and model configurations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An ingested paper: normalized content plus the structured fields produced
/// by a successful extraction run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    /// Original upload name, kept even after extraction finds a better title.
    pub filename: String,
    pub title: String,
    pub authors: Vec<String>,
    pub year: Option<i64>,
    pub doi: Option<String>,
    pub normalized_text: String,
    pub markdown: String,
    pub content_hash: String,
    /// `None` until one extraction run has fully succeeded. The field set is
    /// written wholesale; a partially extracted document is never stored.
    pub extraction: Option<ExtractedFields>,
    pub created_at: DateTime<Utc>,
}

/// The complete structured field set produced by one extraction pass.
///
/// Narrative fields default to empty strings when the model omits them, so a
/// present `ExtractedFields` always carries the whole set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub title: String,
    pub authors: Vec<String>,
    pub year: Option<i64>,
    pub doi: Option<String>,
    pub background: String,
    pub research_question: String,
    pub major_findings: String,
    pub suggestions: String,
}

/// Input for creating (or re-uploading) a document from normalized content.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub filename: String,
    pub normalized_text: String,
    pub markdown: String,
    pub content_hash: String,
}

/// Input for attaching a catalog paper to a search.
#[derive(Debug, Clone, Default)]
pub struct NewPaper {
    pub title: String,
    pub authors: Vec<String>,
    pub year: Option<i64>,
    pub doi: Option<String>,
    pub abstract_text: Option<String>,
}

/// A named grouping of documents. Membership is many-to-many and lives in its
/// own join rows; deleting a batch never deletes the member documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// One batch/document membership row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub batch_id: String,
    pub document_id: String,
    pub added_at: DateTime<Utc>,
}

/// A user-issued research query. Owns its papers: deleting a search deletes
/// them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Search {
    pub id: String,
    pub query: String,
    pub created_at: DateTime<Utc>,
}

/// A catalog result attached to exactly one search. Field population is done
/// by the external search collaborator; the core only stores and serves it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    pub id: String,
    pub search_id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub year: Option<i64>,
    pub doi: Option<String>,
    pub abstract_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// What a conversation is grounded in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum TargetRef {
    Document(String),
    Paper(String),
    Batch(String),
    /// Free-form chat with no fixed document content. The string is a
    /// caller-chosen key so the same ad-hoc thread can be reopened.
    AdHoc(String),
}

impl TargetRef {
    pub fn kind(&self) -> &'static str {
        match self {
            TargetRef::Document(_) => "document",
            TargetRef::Paper(_) => "paper",
            TargetRef::Batch(_) => "batch",
            TargetRef::AdHoc(_) => "ad_hoc",
        }
    }

    pub fn target_id(&self) -> &str {
        match self {
            TargetRef::Document(id)
            | TargetRef::Paper(id)
            | TargetRef::Batch(id)
            | TargetRef::AdHoc(id) => id,
        }
    }

    /// Rebuilds a reference from its stored (kind, id) pair.
    pub fn from_parts(kind: &str, id: &str) -> Option<Self> {
        match kind {
            "document" => Some(TargetRef::Document(id.to_string())),
            "paper" => Some(TargetRef::Paper(id.to_string())),
            "batch" => Some(TargetRef::Batch(id.to_string())),
            "ad_hoc" => Some(TargetRef::AdHoc(id.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.target_id())
    }
}

/// An ordered dialogue scoped to one target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub target: TargetRef,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

/// One message within a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: i64,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A named AI provider/credential/endpoint binding. Exactly one config is
/// flagged default at any time; the swap is a single storage transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub id: String,
    /// Provider type: "gemini" or "local" (OpenAI-compatible).
    pub provider: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model_name: String,
    pub is_default: bool,
    pub updated_at: DateTime<Utc>,
}

/// Input for registering a model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewModelConfig {
    pub provider: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model_name: String,
}
