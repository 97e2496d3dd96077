//! Text-generation collaborator contract and its cache-checked adapter

use crate::cache::{Bucket, CacheValue, PersistentCache};
use crate::error::CoreResult;
use crate::llm::messages::ChatMessage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Sampling parameters for a generation request.
///
/// Serialized field order is fixed, so the same logical parameters always
/// produce the same cache context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Nucleus sampling cutoff
    pub top_p: Option<f32>,
    /// Top-k sampling cutoff
    pub top_k: Option<u32>,
    /// Stop sequences
    pub stop: Option<Vec<String>>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: Some(0.1),
            max_tokens: Some(2048),
            top_p: None,
            top_k: None,
            stop: None,
        }
    }
}

/// A text-generation collaborator.
///
/// Implementations are thin transports: they map a message sequence and
/// parameters to generated text and surface non-2xx or invalid-JSON
/// responses as [`CoreError::Upstream`](crate::error::CoreError::Upstream).
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for the given conversation.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> CoreResult<String>;
}

/// Cache-checked adapter over any [`TextGenerator`].
///
/// The cache key uses the last message as the prompt and a JSON
/// serialization of the full message sequence plus parameters as the
/// context, so two conversations that share a final message but differ in
/// history never collide.
pub struct CachedTextGenerator {
    inner: Arc<dyn TextGenerator>,
    cache: Arc<PersistentCache>,
}

impl CachedTextGenerator {
    /// Wrap `inner` with cache checks against the text bucket of `cache`.
    pub fn new(inner: Arc<dyn TextGenerator>, cache: Arc<PersistentCache>) -> Self {
        Self { inner, cache }
    }

    /// The underlying cache store.
    pub fn cache(&self) -> &Arc<PersistentCache> {
        &self.cache
    }

    fn request_context(messages: &[ChatMessage], params: &GenerationParams) -> String {
        #[derive(Serialize)]
        struct RequestContext<'a> {
            messages: &'a [ChatMessage],
            params: &'a GenerationParams,
        }
        serde_json::to_string(&RequestContext { messages, params })
            .unwrap_or_else(|_| format!("{messages:?}:{params:?}"))
    }
}

#[async_trait]
impl TextGenerator for CachedTextGenerator {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> CoreResult<String> {
        let prompt = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
        let context = Self::request_context(messages, params);

        if let Some(hit) = self.cache.get(prompt, &context, Bucket::Text).await {
            if let Some(text) = hit.into_text() {
                debug!("text completion served from cache");
                return Ok(text);
            }
            // A non-text payload under a text key is corruption; fall
            // through to regeneration.
        }

        let fresh = self.inner.complete(messages, params).await?;
        self.cache
            .set(prompt, &CacheValue::Text(fresh.clone()), &context, Bucket::Text)
            .await;
        Ok(fresh)
    }
}
