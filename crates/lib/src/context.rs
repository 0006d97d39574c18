//! # Context Assembler
//!
//! Builds the bounded prompt payload for one chat exchange: resolves the
//! target to its content, applies the character budget with a fixed
//! truncation priority (structured fields in full, then a relevant text
//! excerpt, with older batch content dropped first), and appends a bounded
//! window of recent turns. Assembly is deterministic for identical inputs
//! and budget.

use crate::{
    batch,
    prompts::chat::{AD_HOC_SYSTEM_PROMPT, CHAT_SYSTEM_PROMPT, CHAT_USER_PROMPT},
    providers::db::{sqlite::SqliteProvider, StorageError},
    types::{Document, Paper, Role, TargetRef, Turn},
};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Size limits for one assembled payload. The character budget bounds the
/// source-material and history sections; the fixed instruction scaffolding
/// and the new user question ride on top.
#[derive(Debug, Clone, Copy)]
pub struct ContextBudget {
    pub max_context_chars: usize,
    pub max_history_turns: usize,
}

impl Default for ContextBudget {
    fn default() -> Self {
        Self {
            max_context_chars: 24_000,
            max_history_turns: 12,
        }
    }
}

#[derive(Error, Debug)]
pub enum ContextError {
    /// The chat target no longer exists. Surfaced immediately instead of
    /// producing a silently empty context.
    #[error("Chat target could not be resolved: {0}")]
    Resolution(String),
    #[error("Storage error while assembling context: {0}")]
    Storage(StorageError),
}

/// The assembled payload for one exchange, with the bounded sections exposed
/// so callers (and tests) can observe the budget being honored.
#[derive(Debug, Clone)]
pub struct ContextPayload {
    pub system_prompt: String,
    pub source_block: String,
    pub history_block: String,
    pub question: String,
}

impl ContextPayload {
    /// Renders the user-side prompt in its fixed section order.
    pub fn user_prompt(&self) -> String {
        let source = if self.source_block.is_empty() {
            "(none)"
        } else {
            self.source_block.as_str()
        };
        let history = if self.history_block.is_empty() {
            "(none)"
        } else {
            self.history_block.as_str()
        };
        CHAT_USER_PROMPT
            .replace("{source_material}", source)
            .replace("{history}", history)
            .replace("{question}", &self.question)
    }

    /// Characters spent on the budgeted sections.
    pub fn context_chars(&self) -> usize {
        self.source_block.chars().count() + self.history_block.chars().count()
    }
}

#[derive(Clone)]
pub struct ContextAssembler {
    store: Arc<SqliteProvider>,
    budget: ContextBudget,
}

impl ContextAssembler {
    pub fn new(store: Arc<SqliteProvider>, budget: ContextBudget) -> Self {
        Self { store, budget }
    }

    /// Builds the payload for the next exchange on `target`.
    ///
    /// `history` is the conversation before the new question; only the most
    /// recent turns within the turn budget are included.
    pub async fn assemble(
        &self,
        target: &TargetRef,
        history: &[Turn],
        user_text: &str,
    ) -> Result<ContextPayload, ContextError> {
        let history_block = render_history(history, self.budget.max_history_turns);
        let source_budget = self
            .budget
            .max_context_chars
            .saturating_sub(history_block.chars().count());

        let (system_prompt, source_block) = match target {
            TargetRef::Document(id) => {
                let document = self
                    .store
                    .get_document(id)
                    .await
                    .map_err(|e| resolve_err(e, target))?;
                (
                    CHAT_SYSTEM_PROMPT.to_string(),
                    document_block(&document, user_text, source_budget),
                )
            }
            TargetRef::Batch(id) => {
                let batch = batch::get_batch(&self.store, id)
                    .await
                    .map_err(|e| resolve_err(e, target))?;
                let documents = batch::list_documents(&self.store, id)
                    .await
                    .map_err(|e| resolve_err(e, target))?;
                (
                    CHAT_SYSTEM_PROMPT.to_string(),
                    batch_block(&batch.name, &documents, source_budget),
                )
            }
            TargetRef::Paper(id) => {
                let paper = self
                    .store
                    .get_paper(id)
                    .await
                    .map_err(|e| resolve_err(e, target))?;
                (
                    CHAT_SYSTEM_PROMPT.to_string(),
                    head_chars(&paper_block(&paper), source_budget),
                )
            }
            // Ad-hoc chat carries no document content; the context is the
            // conversation history alone.
            TargetRef::AdHoc(_) => (AD_HOC_SYSTEM_PROMPT.to_string(), String::new()),
        };

        Ok(ContextPayload {
            system_prompt,
            source_block,
            history_block,
            question: user_text.to_string(),
        })
    }
}

fn resolve_err(err: StorageError, target: &TargetRef) -> ContextError {
    if err.is_not_found() {
        ContextError::Resolution(target.to_string())
    } else {
        ContextError::Storage(err)
    }
}

/// The most recent turns, oldest first, rendered one per line group.
fn render_history(history: &[Turn], max_turns: usize) -> String {
    let start = history.len().saturating_sub(max_turns);
    history[start..]
        .iter()
        .map(|turn| {
            let speaker = match turn.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            format!("{speaker}: {}", turn.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Source material for a single document: the structured fields in full,
/// then a budgeted excerpt of the normalized text anchored near the latest
/// question's keywords. Fields are never truncated before text.
fn document_block(document: &Document, user_text: &str, budget: usize) -> String {
    let fields = fields_block(document);
    let fields_chars = fields.chars().count();
    if fields_chars >= budget {
        return head_chars(&fields, budget);
    }

    const EXCERPT_HEADER: &str = "\n\nText excerpt:\n";
    let excerpt_budget = budget
        .saturating_sub(fields_chars)
        .saturating_sub(EXCERPT_HEADER.chars().count());
    let excerpt = select_excerpt(&document.normalized_text, user_text, excerpt_budget);
    if excerpt.is_empty() {
        fields
    } else {
        format!("{fields}{EXCERPT_HEADER}{excerpt}")
    }
}

/// Source material for a batch: member documents' structured fields (no raw
/// text, to control size) in addition order. When over budget, the oldest
/// additions are dropped first.
fn batch_block(batch_name: &str, documents: &[Document], budget: usize) -> String {
    let header = format!("Documents in batch '{batch_name}':");
    let blocks: Vec<String> = documents.iter().map(fields_block).collect();

    let mut used = header.chars().count();
    let mut kept = vec![false; blocks.len()];
    for index in (0..blocks.len()).rev() {
        let cost = blocks[index].chars().count() + 2;
        if used + cost > budget {
            break;
        }
        kept[index] = true;
        used += cost;
    }

    let omitted = kept.iter().filter(|k| !**k).count();
    if omitted > 0 {
        debug!("Batch context over budget: omitted the {omitted} oldest member documents");
    }

    let mut parts = vec![header];
    parts.extend(
        blocks
            .into_iter()
            .zip(kept)
            .filter(|(_, keep)| *keep)
            .map(|(block, _)| block),
    );
    parts.join("\n\n")
}

/// The structured field summary for one document. Short and high-signal, so
/// it is always kept whole when it fits at all.
fn fields_block(document: &Document) -> String {
    let mut lines = vec![format!("## {}", document.title)];
    if !document.authors.is_empty() {
        lines.push(format!("Authors: {}", document.authors.join(", ")));
    }
    if let Some(year) = document.year {
        lines.push(format!("Year: {year}"));
    }
    if let Some(doi) = &document.doi {
        lines.push(format!("DOI: {doi}"));
    }
    match &document.extraction {
        Some(fields) => {
            for (label, value) in [
                ("Background", &fields.background),
                ("Research question", &fields.research_question),
                ("Major findings", &fields.major_findings),
                ("Suggestions", &fields.suggestions),
            ] {
                if !value.is_empty() {
                    lines.push(format!("{label}: {value}"));
                }
            }
        }
        None => lines.push("Structured fields have not been extracted yet.".to_string()),
    }
    lines.join("\n")
}

fn paper_block(paper: &Paper) -> String {
    let mut lines = vec![format!("## {}", paper.title)];
    if !paper.authors.is_empty() {
        lines.push(format!("Authors: {}", paper.authors.join(", ")));
    }
    if let Some(year) = paper.year {
        lines.push(format!("Year: {year}"));
    }
    if let Some(doi) = &paper.doi {
        lines.push(format!("DOI: {doi}"));
    }
    if let Some(abstract_text) = &paper.abstract_text {
        lines.push(format!("Abstract: {abstract_text}"));
    }
    lines.join("\n")
}

/// Picks the excerpt of `text` most relevant to the latest user turn: a
/// window starting shortly before the first occurrence of the question's
/// longest keyword, or the head of the text when nothing matches.
fn select_excerpt(text: &str, latest_user_turn: &str, budget: usize) -> String {
    if budget == 0 || text.is_empty() {
        return String::new();
    }
    if text.chars().count() <= budget {
        return text.to_string();
    }

    let anchor = anchor_offset(text, latest_user_turn).unwrap_or(0);
    let start = floor_char_boundary(text, anchor.saturating_sub(budget / 5));
    head_chars(&text[start..], budget)
}

/// Byte offset of the first case-insensitive hit of the question's longest
/// word (>3 chars), clamped into the text.
fn anchor_offset(text: &str, question: &str) -> Option<usize> {
    let keyword = question
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| w.chars().count() > 3)
        .max_by_key(|w| w.chars().count())?;
    let position = text.to_lowercase().find(&keyword.to_lowercase())?;
    Some(position.min(text.len()))
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// First `limit` characters of the text, on a char boundary.
fn head_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
