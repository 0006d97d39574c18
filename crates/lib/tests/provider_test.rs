//! # AI Provider Wire Tests
//!
//! HTTP-level tests for the two provider implementations against a mock
//! server: request/response shapes, SSE streaming with and without the
//! completion marker, and error surfacing.

mod common;

use common::setup_tracing;
use paperchat::errors::ProviderError;
use paperchat::providers::ai::gemini::GeminiProvider;
use paperchat::providers::ai::local::LocalAiProvider;
use paperchat::providers::ai::AiProvider;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn local_provider(server: &MockServer) -> LocalAiProvider {
    LocalAiProvider::new(
        format!("{}/v1/chat/completions", server.uri()),
        Some("test-key".to_string()),
        Some("test-model".to_string()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_local_generate_parses_choices() {
    setup_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "pong"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let answer = local_provider(&server)
        .generate("system prompt", "ping")
        .await
        .unwrap();
    assert_eq!(answer, "pong");
}

#[tokio::test]
async fn test_local_error_status_is_surfaced() {
    setup_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model exploded"))
        .mount(&server)
        .await;

    let err = local_provider(&server)
        .generate("system prompt", "ping")
        .await
        .unwrap_err();
    match err {
        ProviderError::Api(message) => assert!(message.contains("model exploded")),
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_local_stream_collects_deltas_until_done() {
    setup_tracing();
    let server = MockServer::start().await;
    let sse_body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\" world\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{}}]}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_body.as_bytes(), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let stream = local_provider(&server)
        .generate_stream("system prompt", "say hello")
        .await
        .unwrap();
    assert_eq!(stream.collect_text().await.unwrap(), "Hello world");
}

#[tokio::test]
async fn test_local_stream_without_done_marker_is_truncated() {
    setup_tracing();
    let server = MockServer::start().await;
    let sse_body = "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n";
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_body.as_bytes(), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let stream = local_provider(&server)
        .generate_stream("system prompt", "say hello")
        .await
        .unwrap();
    let err = stream.collect_text().await.unwrap_err();
    assert!(matches!(err, ProviderError::StreamTruncated), "got: {err:?}");
}

#[tokio::test]
async fn test_gemini_generate_parses_candidates() {
    setup_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-test:generateContent"))
        .and(query_param("key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "pong"}]}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = GeminiProvider::new(
        format!("{}/v1beta/models/gemini-test:generateContent", server.uri()),
        "secret".to_string(),
    )
    .unwrap();
    let answer = provider.generate("system prompt", "ping").await.unwrap();
    assert_eq!(answer, "pong");
}

#[tokio::test]
async fn test_gemini_stream_ends_cleanly_without_marker() {
    setup_tracing();
    let server = MockServer::start().await;
    let sse_body = concat!(
        "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hel\"}]}}]}\n\n",
        "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"lo\"}]}}]}\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-test:streamGenerateContent"))
        .and(query_param("alt", "sse"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_body.as_bytes(), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let provider = GeminiProvider::new(
        format!("{}/v1beta/models/gemini-test:generateContent", server.uri()),
        "secret".to_string(),
    )
    .unwrap();
    let stream = provider
        .generate_stream("system prompt", "say hello")
        .await
        .unwrap();
    assert_eq!(stream.collect_text().await.unwrap(), "Hello");
}

#[tokio::test]
async fn test_gemini_error_status_is_surfaced() {
    setup_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_string("key rejected"))
        .mount(&server)
        .await;

    let provider = GeminiProvider::new(
        format!("{}/v1beta/models/gemini-test:generateContent", server.uri()),
        "bad-key".to_string(),
    )
    .unwrap();
    let err = provider.generate("system prompt", "ping").await.unwrap_err();
    match err {
        ProviderError::Api(message) => assert!(message.contains("key rejected")),
        other => panic!("expected Api error, got: {other:?}"),
    }
}
