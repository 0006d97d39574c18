//! # Model Registry Tests
//!
//! The single-default invariant: the first registered config becomes the
//! default, and a swap atomically leaves exactly one default visible both
//! in storage and in the in-process snapshot.

mod common;

use common::{memory_store, setup_tracing};
use paperchat::errors::ProviderError;
use paperchat::registry::{create_provider, ModelRegistry};
use paperchat::types::NewModelConfig;
use std::sync::Arc;

fn local_config(model_name: &str) -> NewModelConfig {
    NewModelConfig {
        provider: "local".to_string(),
        api_key: None,
        base_url: Some("http://localhost:8080/v1/chat/completions".to_string()),
        model_name: model_name.to_string(),
    }
}

#[tokio::test]
async fn test_first_registered_config_becomes_default() {
    setup_tracing();
    let store = Arc::new(memory_store().await);
    let registry = ModelRegistry::load(Arc::clone(&store)).await.unwrap();
    assert!(registry.default_config().await.is_none());

    let m1 = registry.register(local_config("model-one")).await.unwrap();
    assert!(m1.is_default);
    assert_eq!(
        registry.default_config().await.map(|c| c.id),
        Some(m1.id.clone())
    );

    let m2 = registry.register(local_config("model-two")).await.unwrap();
    assert!(!m2.is_default);
}

#[tokio::test]
async fn test_default_swap_leaves_exactly_one_default() {
    setup_tracing();
    let store = Arc::new(memory_store().await);
    let registry = ModelRegistry::load(Arc::clone(&store)).await.unwrap();
    let m1 = registry.register(local_config("model-one")).await.unwrap();
    let m2 = registry.register(local_config("model-two")).await.unwrap();

    registry.set_default(&m2.id).await.unwrap();

    // Re-read every config: the previous default was cleared in the same
    // swap that set the new one.
    let configs = registry.list().await.unwrap();
    let defaults: Vec<_> = configs.iter().filter(|c| c.is_default).collect();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0].id, m2.id);
    assert!(!configs.iter().find(|c| c.id == m1.id).unwrap().is_default);

    assert_eq!(registry.default_config().await.map(|c| c.id), Some(m2.id));
}

#[tokio::test]
async fn test_registry_loads_the_stored_default() {
    setup_tracing();
    let store = Arc::new(memory_store().await);
    let registry = ModelRegistry::load(Arc::clone(&store)).await.unwrap();
    let m1 = registry.register(local_config("model-one")).await.unwrap();
    let m2 = registry.register(local_config("model-two")).await.unwrap();
    registry.set_default(&m2.id).await.unwrap();
    drop(registry);

    // A fresh process sees the persisted default, not the first row.
    let reloaded = ModelRegistry::load(Arc::clone(&store)).await.unwrap();
    let default = reloaded.default_config().await.unwrap();
    assert_eq!(default.id, m2.id);
    assert_ne!(default.id, m1.id);
}

#[tokio::test]
async fn test_set_default_on_missing_config_is_not_found() {
    setup_tracing();
    let store = Arc::new(memory_store().await);
    let registry = ModelRegistry::load(Arc::clone(&store)).await.unwrap();
    let err = registry.set_default("missing").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_provider_factory_validates_configs() {
    setup_tracing();
    let store = Arc::new(memory_store().await);
    let registry = ModelRegistry::load(Arc::clone(&store)).await.unwrap();

    let local = registry.register(local_config("model-one")).await.unwrap();
    assert!(create_provider(&local).is_ok());

    let mut no_url = local.clone();
    no_url.base_url = None;
    assert!(matches!(
        create_provider(&no_url).unwrap_err(),
        ProviderError::MissingBaseUrl(_)
    ));

    let mut gemini = local.clone();
    gemini.provider = "gemini".to_string();
    gemini.api_key = None;
    assert!(matches!(
        create_provider(&gemini).unwrap_err(),
        ProviderError::MissingApiKey(_)
    ));
    gemini.api_key = Some("key".to_string());
    gemini.base_url = None;
    assert!(create_provider(&gemini).is_ok());

    let mut unknown = local;
    unknown.provider = "mainframe".to_string();
    assert!(matches!(
        create_provider(&unknown).unwrap_err(),
        ProviderError::UnsupportedProvider(_)
    ));
}
