//! OpenAI-compatible chat-completions provider
//!
//! Covers self-hosted model endpoints (Vertex AI, TGI, vLLM and friends)
//! that speak the `/chat/completions` wire format with a bearer token.

use crate::error::{CoreError, CoreResult};
use crate::llm::client::{GenerationParams, TextGenerator};
use crate::llm::messages::ChatMessage;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::instrument;

/// Chat-completions endpoint handler
pub struct ChatCompletionsProvider {
    http_client: Client,
    endpoint: String,
    bearer_token: Option<String>,
    model: String,
}

impl ChatCompletionsProvider {
    /// Create a new provider for an OpenAI-compatible endpoint
    pub fn new(http_client: Client, endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http_client,
            endpoint: endpoint.into(),
            bearer_token: None,
            model: model.into(),
        }
    }

    /// Attach a bearer token to every request
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    fn request_body(&self, messages: &[ChatMessage], params: &GenerationParams) -> Value {
        let converted: Vec<Value> = messages
            .iter()
            .map(|m| json!({"role": m.role.to_string(), "content": m.content}))
            .collect();

        let mut body = json!({
            "model": self.model,
            "messages": converted,
        });
        if let Some(max_tokens) = params.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if let Some(temperature) = params.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(top_p) = params.top_p {
            body["top_p"] = json!(top_p);
        }
        if let Some(stop) = &params.stop {
            body["stop"] = json!(stop);
        }
        body
    }
}

#[async_trait]
impl TextGenerator for ChatCompletionsProvider {
    #[instrument(skip(self, messages, params), level = "debug")]
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> CoreResult<String> {
        let mut request = self
            .http_client
            .post(&self.endpoint)
            .json(&self.request_body(messages, params));
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CoreError::upstream(format!("chat completion request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(CoreError::upstream(format!(
                "chat completion error (status {status}): {error_text}"
            )));
        }

        let response_json: Value = response.json().await.map_err(|e| {
            CoreError::upstream(format!("failed to parse chat completion response: {e}"))
        })?;

        response_json["choices"][0]["message"]["content"]
            .as_str()
            .map(|text| text.to_string())
            .ok_or_else(|| {
                CoreError::upstream(format!(
                    "chat completion response missing content: {response_json}"
                ))
            })
    }
}
