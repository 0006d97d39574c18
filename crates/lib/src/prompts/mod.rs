//! # Prompt Templates
//!
//! Fixed instruction templates for every LLM call the pipeline makes. Keeping
//! them in one place makes the extraction and chat flows deterministic and
//! lets tests assert on the exact instructions sent to a provider.

pub mod chat;
pub mod extract;
