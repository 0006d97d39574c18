//! # Model Configuration Registry
//!
//! Process-wide state for the "current default model" with a defined init
//! (load from the store) and update (atomic swap), passed explicitly into
//! the conversation engine rather than read from ambient globals. Reads
//! always observe a single consistent default; a swap clears the previous
//! default and sets the new one in one storage transaction before the
//! in-process copy is replaced.

use crate::{
    errors::ProviderError,
    providers::{
        ai::{gemini::GeminiProvider, local::LocalAiProvider, AiProvider},
        db::{sqlite::SqliteProvider, StorageError},
    },
    types::{ModelConfig, NewModelConfig},
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

pub struct ModelRegistry {
    store: Arc<SqliteProvider>,
    current: RwLock<Option<ModelConfig>>,
}

impl ModelRegistry {
    /// Loads the registry, reading the stored default if one exists.
    pub async fn load(store: Arc<SqliteProvider>) -> Result<Self, StorageError> {
        let current = store.get_default_model_config().await?;
        if let Some(config) = &current {
            info!(
                "Loaded default model config '{}' ({})",
                config.model_name, config.id
            );
        }
        Ok(Self {
            store,
            current: RwLock::new(current),
        })
    }

    /// A consistent snapshot of the current default, if any.
    pub async fn default_config(&self) -> Option<ModelConfig> {
        self.current.read().await.clone()
    }

    /// Stores a new configuration. The first registered config becomes the
    /// default automatically so chat can work without further setup.
    pub async fn register(&self, new: NewModelConfig) -> Result<ModelConfig, StorageError> {
        let config = self.store.save_model_config(&new).await?;
        if self.current.read().await.is_none() {
            return self.set_default(&config.id).await;
        }
        Ok(config)
    }

    /// Atomically makes `id` the only default and refreshes the in-process
    /// snapshot.
    pub async fn set_default(&self, id: &str) -> Result<ModelConfig, StorageError> {
        let config = self.store.set_default_model_config(id).await?;
        *self.current.write().await = Some(config.clone());
        Ok(config)
    }

    pub async fn list(&self) -> Result<Vec<ModelConfig>, StorageError> {
        self.store.list_model_configs().await
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry").finish_non_exhaustive()
    }
}

/// Instantiates the AI capability for a model configuration.
///
/// Gemini derives its endpoint from the model name when no base URL is
/// given; OpenAI-compatible providers always need an explicit URL.
pub fn create_provider(config: &ModelConfig) -> Result<Box<dyn AiProvider>, ProviderError> {
    match config.provider.as_str() {
        "gemini" => {
            let api_key = config
                .api_key
                .clone()
                .ok_or_else(|| ProviderError::MissingApiKey(config.provider.clone()))?;
            let api_url = config.base_url.clone().unwrap_or_else(|| {
                format!(
                    "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
                    config.model_name
                )
            });
            Ok(Box::new(GeminiProvider::new(api_url, api_key)?))
        }
        "local" => {
            let api_url = config
                .base_url
                .clone()
                .ok_or_else(|| ProviderError::MissingBaseUrl(config.provider.clone()))?;
            Ok(Box::new(LocalAiProvider::new(
                api_url,
                config.api_key.clone(),
                Some(config.model_name.clone()),
            )?))
        }
        other => Err(ProviderError::UnsupportedProvider(other.to_string())),
    }
}
