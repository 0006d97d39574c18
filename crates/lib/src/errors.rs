use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the AI capability layer.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(reqwest::Error),
    #[error("Failed to send request to AI provider: {0}")]
    Request(reqwest::Error),
    #[error("AI provider returned an error: {0}")]
    Api(String),
    #[error("Failed to deserialize AI provider response: {0}")]
    Deserialization(reqwest::Error),
    #[error("AI response stream ended before the completion marker")]
    StreamTruncated,
    #[error("AI call exceeded the timeout of {0:?}")]
    Timeout(Duration),
    #[error("API key is missing for provider '{0}'")]
    MissingApiKey(String),
    #[error("Base URL is missing for provider '{0}'")]
    MissingBaseUrl(String),
    #[error("Unsupported AI provider type: {0}")]
    UnsupportedProvider(String),
    #[error("No model configuration is available and no default is set")]
    MissingModelConfig,
}
