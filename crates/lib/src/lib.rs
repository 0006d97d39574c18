//! # paperchat
//!
//! Document intelligence and context-grounded chat for academic papers.
//! This crate provides the orchestration between raw uploads, structured
//! extraction, and grounded multi-turn dialogue: a text normalizer, an
//! LLM-backed extraction engine, batch organization, a budgeted context
//! assembler, and a streaming conversation engine, over a configurable AI
//! provider and a SQLite storage collaborator.

pub mod batch;
pub mod chat;
pub mod context;
pub mod errors;
pub mod extract;
pub mod ingest;
pub mod normalize;
pub mod prompts;
pub mod providers;
pub mod registry;
pub mod types;

pub use chat::{AnswerStream, ChatEngine, ChatError, ChatEvent};
pub use context::{ContextAssembler, ContextBudget, ContextError, ContextPayload};
pub use errors::ProviderError;
pub use extract::{ExtractError, Extractor};
pub use ingest::{ingest_document, ExtractionStatus, IngestError, IngestOutcome};
pub use normalize::{normalize, NormalizeError, NormalizedText};
pub use registry::{create_provider, ModelRegistry};
pub use types::{
    Batch, Conversation, Document, ExtractedFields, Membership, ModelConfig, NewDocument,
    NewModelConfig, NewPaper, Paper, Role, Search, TargetRef, Turn,
};
