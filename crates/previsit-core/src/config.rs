//! Configuration
//!
//! A single TOML file with environment-variable overrides for the values
//! that are secrets or deployment toggles. Every field has a default so an
//! empty config is a working simulator (minus API credentials).

use crate::error::{CoreError, CoreResult};
use crate::llm::GenerationParams;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Cache store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Root directory of the store
    pub dir: PathBuf,
    /// Namespace folded into every cache key
    pub language: String,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("cache"),
            language: "en".to_string(),
        }
    }
}

/// Which text-generation transport to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Gemini generateContent REST API
    Gemini,
    /// OpenAI-compatible /chat/completions endpoint
    ChatCompletions,
}

/// Text-generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Transport to use
    pub provider: ProviderKind,
    /// Model identifier
    pub model: String,
    /// API key for the Gemini transport
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Endpoint URL for the chat-completions transport
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Bearer token for the chat-completions transport
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
    /// Sampling parameters applied to every request
    pub params: GenerationParams,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Gemini,
            model: "gemini-2.5-flash".to_string(),
            api_key: None,
            endpoint: None,
            bearer_token: None,
            params: GenerationParams::default(),
        }
    }
}

/// Speech-synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    /// Whether new audio may be synthesized. When false, previously cached
    /// audio is still served through the read-only path.
    pub enabled: bool,
    /// TTS model identifier
    pub model: String,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            model: "gemini-2.5-flash-preview-tts".to_string(),
        }
    }
}

/// Interview pacing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterviewSettings {
    /// Hard cap on history entries; bounds cost and guarantees termination
    /// even if the completion marker never appears. The default is the
    /// opening line plus the interviewer's 20-question budget.
    pub turn_limit: usize,
    /// Provider voice for the interviewer's lines
    pub interviewer_voice: String,
    /// Sampling parameters for interview turns
    pub params: GenerationParams,
}

impl Default for InterviewSettings {
    fn default() -> Self {
        Self {
            turn_limit: 41,
            interviewer_voice: "Aoede".to_string(),
            params: GenerationParams::default(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Cache store settings
    pub cache: CacheSettings,
    /// Text-generation settings
    pub generation: GenerationSettings,
    /// Speech-synthesis settings
    pub speech: SpeechSettings,
    /// Interview pacing settings
    pub interview: InterviewSettings,
}

impl AppConfig {
    /// Load configuration from `path` (or defaults when `None`), then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    CoreError::config(format!("failed to read config {}: {e}", path.display()))
                })?;
                toml::from_str(&raw).map_err(|e| {
                    CoreError::config(format!("malformed config {}: {e}", path.display()))
                })?
            }
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Apply environment-variable overrides:
    /// `CACHE_DIR`, `GEMINI_API_KEY`, `MODEL_ENDPOINT`, `MODEL_BEARER_TOKEN`,
    /// and `GENERATE_SPEECH`.
    pub fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var("CACHE_DIR") {
            self.cache.dir = PathBuf::from(dir);
        }
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            self.generation.api_key = Some(key);
        }
        if let Ok(endpoint) = std::env::var("MODEL_ENDPOINT") {
            self.generation.provider = ProviderKind::ChatCompletions;
            self.generation.endpoint = Some(endpoint);
        }
        if let Ok(token) = std::env::var("MODEL_BEARER_TOKEN") {
            self.generation.bearer_token = Some(token);
        }
        if let Ok(flag) = std::env::var("GENERATE_SPEECH") {
            self.speech.enabled = flag.eq_ignore_ascii_case("true");
        }
        debug!(
            provider = ?self.generation.provider,
            speech_enabled = self.speech.enabled,
            "configuration resolved"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = AppConfig::default();
        assert_eq!(config.cache.language, "en");
        assert_eq!(config.interview.turn_limit, 41);
        assert!(!config.speech.enabled);
    }

    #[test]
    fn toml_round_trip() {
        let config = AppConfig::default();
        let raw = toml::to_string(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&raw).unwrap();
        assert_eq!(parsed.interview.turn_limit, config.interview.turn_limit);
        assert_eq!(parsed.generation.model, config.generation.model);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let parsed: AppConfig = toml::from_str("[interview]\nturn_limit = 9\n").unwrap();
        assert_eq!(parsed.interview.turn_limit, 9);
        assert_eq!(parsed.cache.language, "en");
    }
}
