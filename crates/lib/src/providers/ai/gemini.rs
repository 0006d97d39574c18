use crate::{
    errors::ProviderError,
    providers::ai::{completion_channel, next_sse_data, AiProvider, CompletionStream},
};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

// --- Gemini-specific request and response structures ---

#[derive(Serialize)]
struct GeminiRequest {
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize, Debug)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: ContentResponse,
}

#[derive(Deserialize, Debug)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize, Debug)]
struct PartResponse {
    #[serde(default)]
    text: String,
}

// --- Gemini Provider implementation ---

/// A provider for interacting with the Google Gemini API.
#[derive(Clone, Debug)]
pub struct GeminiProvider {
    client: ReqwestClient,
    api_url: String,
    api_key: String,
}

impl GeminiProvider {
    /// Creates a new `GeminiProvider`. The URL is the model's
    /// `:generateContent` endpoint; the streaming variant is derived from it.
    pub fn new(api_url: String, api_key: String) -> Result<Self, ProviderError> {
        let client = ReqwestClient::builder()
            .build()
            .map_err(ProviderError::ClientBuild)?;
        Ok(Self {
            client,
            api_url,
            api_key,
        })
    }

    fn request_body(system_prompt: &str, user_prompt: &str) -> GeminiRequest {
        GeminiRequest {
            system_instruction: Some(Content {
                parts: vec![Part {
                    text: system_prompt.to_string(),
                }],
            }),
            contents: vec![Content {
                parts: vec![Part {
                    text: user_prompt.to_string(),
                }],
            }],
        }
    }

    fn stream_url(&self) -> String {
        self.api_url
            .replace(":generateContent", ":streamGenerateContent")
    }
}

fn first_candidate_text(response: GeminiResponse) -> String {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content.parts.into_iter().next())
        .map(|p| p.text)
        .unwrap_or_default()
}

#[async_trait]
impl AiProvider for GeminiProvider {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ProviderError> {
        let request_body = Self::request_body(system_prompt, user_prompt);

        let response = self
            .client
            .post(&self.api_url)
            .query(&[("key", &self.api_key)])
            .json(&request_body)
            .send()
            .await
            .map_err(ProviderError::Request)?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(error_text));
        }

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .map_err(ProviderError::Deserialization)?;

        Ok(first_candidate_text(gemini_response))
    }

    /// Streams a completion from the `:streamGenerateContent` endpoint with
    /// `alt=sse`. Gemini has no end-of-stream marker; the response ending
    /// cleanly is the completion signal.
    async fn generate_stream(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<CompletionStream, ProviderError> {
        let request_body = Self::request_body(system_prompt, user_prompt);

        let response = self
            .client
            .post(self.stream_url())
            .query(&[("key", self.api_key.as_str()), ("alt", "sse")])
            .json(&request_body)
            .send()
            .await
            .map_err(ProviderError::Request)?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(error_text));
        }

        let (tx, stream) = completion_channel();
        let mut byte_stream = response.bytes_stream();

        tokio::spawn(async move {
            let mut buffer: Vec<u8> = Vec::new();
            loop {
                match byte_stream.next().await {
                    Some(Ok(bytes)) => {
                        buffer.extend(bytes.iter().filter(|&&b| b != b'\r'));
                        while let Some(data) = next_sse_data(&mut buffer) {
                            let text = match serde_json::from_str::<GeminiResponse>(&data) {
                                Ok(chunk) => first_candidate_text(chunk),
                                Err(_) => continue,
                            };
                            if !text.is_empty() && tx.send(Ok(text)).await.is_err() {
                                // Receiver dropped: the caller cancelled.
                                return;
                            }
                        }
                    }
                    Some(Err(e)) => {
                        let _ = tx.send(Err(ProviderError::Request(e))).await;
                        return;
                    }
                    None => return,
                }
            }
        });

        Ok(stream)
    }
}
