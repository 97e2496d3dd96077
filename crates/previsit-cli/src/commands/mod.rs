//! Command implementations

pub mod cache;
pub mod evaluate;
pub mod interview;

use anyhow::{Context, Result};
use previsit_core::config::{AppConfig, ProviderKind};
use previsit_core::llm::{ChatCompletionsProvider, GeminiProvider, TextGenerator};
use previsit_core::speech::{CachedSpeech, GeminiTtsProvider};
use previsit_core::{CoreError, PersistentCache};
use std::sync::Arc;

/// Open the configured cache store.
pub async fn open_cache(config: &AppConfig) -> Result<Arc<PersistentCache>> {
    let cache = PersistentCache::open(&config.cache.dir, config.cache.language.clone())
        .await
        .context("failed to open cache store")?;
    Ok(Arc::new(cache))
}

/// Build the configured text-generation transport.
pub fn build_generator(
    config: &AppConfig,
    http_client: &reqwest::Client,
) -> Result<Arc<dyn TextGenerator>> {
    match config.generation.provider {
        ProviderKind::Gemini => {
            let api_key = config
                .generation
                .api_key
                .clone()
                .ok_or_else(|| CoreError::config("GEMINI_API_KEY is not set"))?;
            Ok(Arc::new(GeminiProvider::new(
                http_client.clone(),
                api_key,
                config.generation.model.clone(),
            )))
        }
        ProviderKind::ChatCompletions => {
            let endpoint = config
                .generation
                .endpoint
                .clone()
                .ok_or_else(|| CoreError::config("MODEL_ENDPOINT is not set"))?;
            let mut provider = ChatCompletionsProvider::new(
                http_client.clone(),
                endpoint,
                config.generation.model.clone(),
            );
            if let Some(token) = &config.generation.bearer_token {
                provider = provider.with_bearer_token(token.clone());
            }
            Ok(Arc::new(provider))
        }
    }
}

/// Build the speech layer in the mode fixed by configuration: full
/// memoization when synthesis is enabled, read-only otherwise.
pub fn build_speech(
    config: &AppConfig,
    http_client: &reqwest::Client,
    cache: Arc<PersistentCache>,
) -> Result<Arc<CachedSpeech>> {
    if !config.speech.enabled {
        return Ok(Arc::new(CachedSpeech::read_only(cache)));
    }
    let api_key = config
        .generation
        .api_key
        .clone()
        .ok_or_else(|| CoreError::config("GEMINI_API_KEY is required when speech is enabled"))?;
    let synthesizer = GeminiTtsProvider::new(http_client.clone(), api_key, config.speech.model.clone());
    Ok(Arc::new(CachedSpeech::enabled(cache, Arc::new(synthesizer))))
}
