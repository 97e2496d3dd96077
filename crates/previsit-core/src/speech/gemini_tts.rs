//! Gemini text-to-speech provider

use crate::error::{CoreError, CoreResult};
use crate::speech::{SpeechSynthesizer, SynthesizedAudio};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::instrument;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini TTS handler
pub struct GeminiTtsProvider {
    http_client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiTtsProvider {
    /// Create a new Gemini TTS provider
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
}

#[async_trait]
impl SpeechSynthesizer for GeminiTtsProvider {
    #[instrument(skip(self, text), level = "debug")]
    async fn synthesize(&self, text: &str, voice: &str) -> CoreResult<SynthesizedAudio> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let body = json!({
            "contents": [{"parts": [{"text": text}]}],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {
                        "prebuiltVoiceConfig": {"voiceName": voice}
                    }
                }
            }
        });

        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::upstream(format!("Gemini TTS request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(CoreError::upstream(format!(
                "Gemini TTS error (status {status}): {error_text}"
            )));
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| CoreError::upstream(format!("failed to parse Gemini TTS response: {e}")))?;

        let inline = &response_json["candidates"][0]["content"]["parts"][0]["inlineData"];
        let mime = inline["mimeType"].as_str().unwrap_or("audio/L16;rate=24000");
        let data = inline["data"].as_str().ok_or_else(|| {
            CoreError::upstream("Gemini TTS response carried no audio data".to_string())
        })?;
        let audio = BASE64
            .decode(data)
            .map_err(|e| CoreError::upstream(format!("Gemini TTS audio was not valid base64: {e}")))?;

        if audio.is_empty() {
            return Err(CoreError::upstream("Gemini TTS returned empty audio".to_string()));
        }

        Ok(SynthesizedAudio {
            audio,
            mime: mime.to_string(),
        })
    }
}
