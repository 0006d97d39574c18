//! # Structured Extraction Engine
//!
//! Turns normalized paper text into the structured Document fields via two
//! prompt-completion calls: a bibliographic pass over the opening of the
//! text and a narrative pass over the body. Responses are parsed tolerantly
//! (missing fields default to empty) and each call gets exactly one retry
//! with a stricter instruction before the extraction is reported failed.
//!
//! Extraction output is only ever applied as a whole field set, so a failed
//! run leaves a document's previously stored fields untouched.

use crate::{
    errors::ProviderError,
    normalize::NormalizedText,
    prompts::extract::{
        BIBLIOGRAPHIC_SYSTEM_PROMPT, EXTRACTION_USER_PROMPT, NARRATIVE_SYSTEM_PROMPT,
        STRICT_RETRY_INSTRUCTION,
    },
    providers::ai::AiProvider,
    types::ExtractedFields,
};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Input ceiling for the bibliographic pass. Citation metadata lives in the
/// opening pages, so the call stays small.
const BIBLIOGRAPHIC_INPUT_CHARS: usize = 6_000;

/// Input ceiling for the narrative pass, which needs most of the paper.
const NARRATIVE_INPUT_CHARS: usize = 48_000;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Document text is empty")]
    EmptyInput,
    #[error("LLM call failed after retry: {0}")]
    Llm(#[source] ProviderError),
    #[error("Failed to parse structured extraction output after retry: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

// Tolerant response shapes: unknown keys are ignored and missing keys
// default to empty instead of failing the whole extraction.

#[derive(Deserialize, Debug, Default)]
struct BibliographicResponse {
    #[serde(default)]
    title: String,
    #[serde(default)]
    authors: Vec<String>,
    #[serde(default)]
    year: Option<i64>,
    #[serde(default)]
    doi: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct NarrativeResponse {
    #[serde(default)]
    background: String,
    #[serde(default)]
    research_question: String,
    #[serde(default)]
    major_findings: String,
    #[serde(default)]
    suggestions: String,
}

/// The extraction engine. Holds the AI capability it extracts with.
pub struct Extractor {
    ai_provider: Box<dyn AiProvider>,
}

impl Extractor {
    pub fn new(ai_provider: Box<dyn AiProvider>) -> Self {
        Self { ai_provider }
    }

    /// Runs both extraction passes and returns the complete field set.
    ///
    /// Not reproducible bit-for-bit (it depends on a generative model) but
    /// idempotent in effect: the caller stores the result wholesale or not
    /// at all.
    #[instrument(skip(self, text))]
    pub async fn extract(&self, text: &NormalizedText) -> Result<ExtractedFields, ExtractError> {
        if text.text.trim().is_empty() {
            return Err(ExtractError::EmptyInput);
        }

        let bibliographic_input = head_chars(&text.text, BIBLIOGRAPHIC_INPUT_CHARS);
        let narrative_input = head_chars(&text.text, NARRATIVE_INPUT_CHARS);

        let bibliographic_prompt = user_prompt(&bibliographic_input);
        let narrative_prompt = user_prompt(&narrative_input);

        let (bibliographic, narrative) = tokio::join!(
            self.call_structured::<BibliographicResponse>(
                BIBLIOGRAPHIC_SYSTEM_PROMPT,
                &bibliographic_prompt,
            ),
            self.call_structured::<NarrativeResponse>(
                NARRATIVE_SYSTEM_PROMPT,
                &narrative_prompt,
            ),
        );
        let bibliographic = bibliographic?;
        let narrative = narrative?;

        Ok(ExtractedFields {
            title: bibliographic.title.trim().to_string(),
            authors: bibliographic
                .authors
                .into_iter()
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .collect(),
            year: bibliographic.year,
            doi: bibliographic
                .doi
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            background: narrative.background.trim().to_string(),
            research_question: narrative.research_question.trim().to_string(),
            major_findings: narrative.major_findings.trim().to_string(),
            suggestions: narrative.suggestions.trim().to_string(),
        })
    }

    /// One structured call with one retry. The retry appends a stricter
    /// "return only the JSON" instruction to the system prompt; its error,
    /// if any, is the one reported.
    async fn call_structured<T: DeserializeOwned>(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<T, ExtractError> {
        match self.call_once(system_prompt, user_prompt).await {
            Ok(parsed) => Ok(parsed),
            Err(first) => {
                warn!("Structured extraction call failed, retrying once with strict instruction: {first}");
                let strict = format!("{system_prompt}\n\n{STRICT_RETRY_INSTRUCTION}");
                self.call_once(&strict, user_prompt).await
            }
        }
    }

    async fn call_once<T: DeserializeOwned>(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<T, ExtractError> {
        let response = self
            .ai_provider
            .generate(system_prompt, user_prompt)
            .await
            .map_err(ExtractError::Llm)?;
        debug!("LLM extraction response: {}", response);
        let payload = json_payload(&response)?;
        serde_json::from_str(&payload).map_err(ExtractError::Parse)
    }
}

fn user_prompt(document_text: &str) -> String {
    EXTRACTION_USER_PROMPT.replace("{document_text}", document_text)
}

/// Pulls the JSON object out of a response, tolerating markdown fences the
/// model adds despite instructions.
fn json_payload(raw: &str) -> Result<String, regex::Error> {
    let re = Regex::new(r"```(?:json)?\n?([\s\S]*?)```")?;
    Ok(re
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| raw.trim().to_string()))
}

/// First `limit` characters of the text, on a char boundary.
fn head_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
