#![allow(dead_code)]
//! # Common Test Utilities
//!
//! Shared mocks and setup for the library's integration tests: an isolated
//! in-memory store, a keyed mock AI provider for extraction logic, and a
//! chunked streaming provider for conversation-engine tests.

use async_trait::async_trait;
use dotenvy::dotenv;
use paperchat::errors::ProviderError;
use paperchat::providers::ai::{completion_channel, AiProvider, CompletionStream};
use paperchat::providers::db::sqlite::SqliteProvider;
use serde_json::json;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

static INIT: Once = Once::new();

/// Initializes the tracing subscriber and loads .env for tests.
pub fn setup_tracing() {
    INIT.call_once(|| {
        dotenv().ok();
        tracing_subscriber::fmt::init();
    });
}

/// A fresh in-memory store with the schema applied.
pub async fn memory_store() -> SqliteProvider {
    let store = SqliteProvider::new(":memory:")
        .await
        .expect("in-memory store");
    store.initialize_schema().await.expect("schema");
    store
}

// --- Keyed Mock AI Provider ---

#[derive(Clone, Debug)]
pub enum ScriptedResponse {
    Reply(String),
    Fail(String),
}

/// A programmable AI provider. Responses are keyed by a substring of the
/// system prompt; keys are checked in insertion order and the first match
/// wins, so a retry-specific key can shadow its base prompt.
#[derive(Clone, Debug, Default)]
pub struct MockAiProvider {
    responses: Arc<Mutex<Vec<(String, ScriptedResponse)>>>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockAiProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_response(&self, key: &str, response: &str) {
        self.responses
            .lock()
            .unwrap()
            .push((key.to_string(), ScriptedResponse::Reply(response.to_string())));
    }

    pub fn add_failure(&self, key: &str, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .push((key.to_string(), ScriptedResponse::Fail(message.to_string())));
    }

    pub fn get_calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AiProvider for MockAiProvider {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push((system_prompt.to_string(), user_prompt.to_string()));

        let responses = self.responses.lock().unwrap();
        for (key, response) in responses.iter() {
            if system_prompt.contains(key) {
                return match response {
                    ScriptedResponse::Reply(text) => Ok(text.clone()),
                    ScriptedResponse::Fail(message) => Err(ProviderError::Api(message.clone())),
                };
            }
        }
        Err(ProviderError::Api(format!(
            "MockAiProvider: No response programmed for system prompt. Got: '{system_prompt}'"
        )))
    }
}

// --- Extraction Fixtures ---

/// Substring of the bibliographic system prompt, used as a mock key.
pub const BIBLIO_KEY: &str = "bibliographic data extraction agent";
/// Substring of the narrative system prompt, used as a mock key.
pub const NARRATIVE_KEY: &str = "expert research analyst";

pub fn bibliographic_json(title: &str) -> String {
    json!({
        "title": title,
        "authors": ["Ada Lovelace", "Charles Babbage"],
        "year": 2021,
        "doi": "10.1000/test.doi"
    })
    .to_string()
}

pub fn narrative_json(findings: &str) -> String {
    json!({
        "background": "Computation on analytical engines.",
        "research_question": "Can machines compute?",
        "major_findings": findings,
        "suggestions": "Build more engines."
    })
    .to_string()
}

/// A mock programmed for one fully successful extraction run.
pub fn extraction_mock(title: &str, findings: &str) -> MockAiProvider {
    let mock = MockAiProvider::new();
    mock.add_response(BIBLIO_KEY, &bibliographic_json(title));
    mock.add_response(NARRATIVE_KEY, &narrative_json(findings));
    mock
}

// --- Chunked Streaming Provider ---

/// A provider that streams a scripted sequence of chunks, optionally with a
/// delay before each chunk and a scripted mid-stream failure.
#[derive(Clone, Debug)]
pub struct ChunkedAiProvider {
    chunks: Vec<String>,
    chunk_delay: Duration,
    fail_after: Option<usize>,
}

impl ChunkedAiProvider {
    pub fn new(chunks: &[&str]) -> Self {
        Self {
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            chunk_delay: Duration::ZERO,
            fail_after: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// Fails the stream after `count` chunks have been delivered.
    pub fn failing_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }
}

#[async_trait]
impl AiProvider for ChunkedAiProvider {
    async fn generate(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
    ) -> Result<String, ProviderError> {
        Ok(self.chunks.concat())
    }

    async fn generate_stream(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
    ) -> Result<CompletionStream, ProviderError> {
        let (tx, stream) = completion_channel();
        let chunks = self.chunks.clone();
        let delay = self.chunk_delay;
        let fail_after = self.fail_after;
        tokio::spawn(async move {
            for (index, chunk) in chunks.iter().enumerate() {
                if fail_after == Some(index) {
                    let _ = tx
                        .send(Err(ProviderError::Api("scripted stream failure".into())))
                        .await;
                    return;
                }
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                if tx.send(Ok(chunk.clone())).await.is_err() {
                    return;
                }
            }
            if fail_after == Some(chunks.len()) {
                let _ = tx
                    .send(Err(ProviderError::Api("scripted stream failure".into())))
                    .await;
            }
        });
        Ok(stream)
    }
}
