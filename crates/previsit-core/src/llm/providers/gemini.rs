//! Gemini provider implementation

use crate::error::{CoreError, CoreResult};
use crate::llm::client::{GenerationParams, TextGenerator};
use crate::llm::messages::{ChatMessage, MessageRole};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::instrument;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini generateContent handler
pub struct GeminiProvider {
    http_client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    /// Create a new Gemini provider
    pub fn new(http_client: Client, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Override the API base URL (test servers, regional endpoints)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn request_body(messages: &[ChatMessage], params: &GenerationParams) -> Value {
        let mut contents = Vec::new();
        let mut system_parts = Vec::new();
        for message in messages {
            match message.role {
                MessageRole::System => system_parts.push(json!({"text": message.content})),
                MessageRole::User => contents.push(json!({
                    "role": "user",
                    "parts": [{"text": message.content}],
                })),
                MessageRole::Assistant => contents.push(json!({
                    "role": "model",
                    "parts": [{"text": message.content}],
                })),
            }
        }

        let mut body = json!({ "contents": contents });
        if !system_parts.is_empty() {
            body["systemInstruction"] = json!({ "parts": system_parts });
        }

        let mut generation_config = json!({});
        if let Some(temperature) = params.temperature {
            generation_config["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = params.max_tokens {
            generation_config["maxOutputTokens"] = json!(max_tokens);
        }
        if let Some(top_p) = params.top_p {
            generation_config["topP"] = json!(top_p);
        }
        if let Some(top_k) = params.top_k {
            generation_config["topK"] = json!(top_k);
        }
        if let Some(stop) = &params.stop {
            generation_config["stopSequences"] = json!(stop);
        }
        if generation_config.as_object().is_some_and(|obj| !obj.is_empty()) {
            body["generationConfig"] = generation_config;
        }

        body
    }
}

#[async_trait]
impl TextGenerator for GeminiProvider {
    #[instrument(skip(self, messages, params), level = "debug")]
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> CoreResult<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let response = self
            .http_client
            .post(&url)
            .json(&Self::request_body(messages, params))
            .send()
            .await
            .map_err(|e| CoreError::upstream(format!("Gemini request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(CoreError::upstream(format!(
                "Gemini API error (status {status}): {error_text}"
            )));
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| CoreError::upstream(format!("failed to parse Gemini response: {e}")))?;

        response_json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(|text| text.to_string())
            .ok_or_else(|| {
                CoreError::upstream(format!(
                    "Gemini response missing candidate text: {response_json}"
                ))
            })
    }
}
