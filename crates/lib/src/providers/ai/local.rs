use crate::{
    errors::ProviderError,
    providers::ai::{completion_channel, next_sse_data, AiProvider, CompletionStream},
};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

// --- OpenAI-compatible request and response structures ---

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    temperature: f32,
    max_tokens: i32,
    stream: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize, Debug)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize, Debug)]
struct ChatCompletionChunk {
    choices: Vec<ChatStreamChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatStreamChoice {
    #[serde(default)]
    delta: ChatDelta,
}

#[derive(Deserialize, Debug, Default)]
struct ChatDelta {
    #[serde(default)]
    content: Option<String>,
}

// --- Local Provider implementation ---

/// A provider for interacting with a local or OpenAI-compatible API.
#[derive(Clone, Debug)]
pub struct LocalAiProvider {
    client: ReqwestClient,
    api_url: String,
    api_key: Option<String>,
    model: Option<String>,
}

impl LocalAiProvider {
    /// Creates a new `LocalAiProvider`.
    pub fn new(
        api_url: String,
        api_key: Option<String>,
        model: Option<String>,
    ) -> Result<Self, ProviderError> {
        let client = ReqwestClient::builder()
            .build()
            .map_err(ProviderError::ClientBuild)?;
        Ok(Self {
            client,
            api_url,
            api_key,
            model,
        })
    }

    fn request_body<'a>(&'a self, system_prompt: &str, user_prompt: &str, stream: bool) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            model: self.model.as_deref(),
            temperature: 0.0,
            max_tokens: 4096,
            stream,
        }
    }

    async fn post(
        &self,
        body: &ChatCompletionRequest<'_>,
    ) -> Result<reqwest::Response, ProviderError> {
        let mut request_builder = self.client.post(&self.api_url);
        if let Some(key) = &self.api_key {
            request_builder = request_builder.bearer_auth(key);
        }
        let response = request_builder
            .json(body)
            .send()
            .await
            .map_err(ProviderError::Request)?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(error_text));
        }
        Ok(response)
    }
}

#[async_trait]
impl AiProvider for LocalAiProvider {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ProviderError> {
        let request_body = self.request_body(system_prompt, user_prompt, false);
        let response = self.post(&request_body).await?;

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(ProviderError::Deserialization)?;

        let raw_response = completion
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default();

        Ok(raw_response)
    }

    /// Streams a completion over the OpenAI-compatible SSE protocol
    /// (`data:` frames terminated by `data: [DONE]`).
    async fn generate_stream(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<CompletionStream, ProviderError> {
        let request_body = self.request_body(system_prompt, user_prompt, true);
        let response = self.post(&request_body).await?;

        let (tx, stream) = completion_channel();
        let mut byte_stream = response.bytes_stream();

        tokio::spawn(async move {
            let mut buffer: Vec<u8> = Vec::new();
            loop {
                match byte_stream.next().await {
                    Some(Ok(bytes)) => {
                        buffer.extend(bytes.iter().filter(|&&b| b != b'\r'));
                        while let Some(data) = next_sse_data(&mut buffer) {
                            if data == "[DONE]" {
                                // Clean completion: closing the channel ends
                                // the stream without an error.
                                return;
                            }
                            let delta = match serde_json::from_str::<ChatCompletionChunk>(&data) {
                                Ok(chunk) => chunk
                                    .choices
                                    .into_iter()
                                    .next()
                                    .and_then(|c| c.delta.content),
                                // Tolerate vendor keep-alive frames.
                                Err(_) => None,
                            };
                            if let Some(text) = delta {
                                if !text.is_empty() && tx.send(Ok(text)).await.is_err() {
                                    // Receiver dropped: the caller cancelled.
                                    return;
                                }
                            }
                        }
                    }
                    Some(Err(e)) => {
                        let _ = tx.send(Err(ProviderError::Request(e))).await;
                        return;
                    }
                    None => {
                        let _ = tx.send(Err(ProviderError::StreamTruncated)).await;
                        return;
                    }
                }
            }
        });

        Ok(stream)
    }
}
