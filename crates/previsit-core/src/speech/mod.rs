//! Speech-synthesis collaborator
//!
//! Synthesis is optional: deployments that disable it still serve
//! previously cached audio through the read-only memoization path. Callers
//! branch on [`SpeechOutcome`] instead of catching errors; a failed
//! synthesis never aborts the turn that requested it.

pub mod gemini_tts;

pub use gemini_tts::GeminiTtsProvider;

use crate::cache::{Bucket, CacheValue, Memoizer, PersistentCache};
use crate::error::CoreResult;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};

/// Name under which synthesis results are memoized. Part of the persisted
/// cache key; changing it orphans existing audio entries.
const MEMO_NAME: &str = "synthesize_speech";

/// Audio produced by a synthesizer.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedAudio {
    /// Encoded audio bytes
    pub audio: Vec<u8>,
    /// MIME type of `audio`
    pub mime: String,
}

/// A speech-synthesis collaborator.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` with the given provider voice.
    async fn synthesize(&self, text: &str, voice: &str) -> CoreResult<SynthesizedAudio>;
}

/// Outcome of a cache-checked synthesis request.
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechOutcome {
    /// Audio is available (from cache or freshly synthesized)
    Ok {
        /// Encoded audio bytes
        audio: Vec<u8>,
        /// MIME type of `audio`
        mime: String,
    },
    /// Synthesis is disabled and no cached audio exists for this request
    Disabled,
    /// Synthesis was attempted and failed
    Failed(String),
}

impl SpeechOutcome {
    /// Whether audio is available.
    pub fn is_ok(&self) -> bool {
        matches!(self, SpeechOutcome::Ok { .. })
    }

    /// Consume into `(audio, mime)` when available.
    pub fn into_parts(self) -> Option<(Vec<u8>, String)> {
        match self {
            SpeechOutcome::Ok { audio, mime } => Some((audio, mime)),
            _ => None,
        }
    }
}

/// Cache-checked speech synthesis.
///
/// Built once at startup in one of two modes, fixed for the process
/// lifetime: `enabled` wraps a synthesizer with full memoization, while
/// `read_only` performs the same key derivation but only ever looks up;
/// the underlying synthesizer is never invoked, so a cold cache yields
/// [`SpeechOutcome::Disabled`].
pub struct CachedSpeech {
    memo: Memoizer,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
}

impl CachedSpeech {
    /// Full memoization: look up, synthesize on miss, store the result.
    pub fn enabled(cache: Arc<PersistentCache>, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        Self {
            memo: Memoizer::new(cache, Bucket::Audio),
            synthesizer: Some(synthesizer),
        }
    }

    /// Read-only mode: serve cached audio, never synthesize.
    pub fn read_only(cache: Arc<PersistentCache>) -> Self {
        Self {
            memo: Memoizer::new(cache, Bucket::Audio),
            synthesizer: None,
        }
    }

    /// Whether this instance can synthesize new audio.
    pub fn can_synthesize(&self) -> bool {
        self.synthesizer.is_some()
    }

    /// Request audio for `text` in `voice`.
    pub async fn synthesize(&self, text: &str, voice: &str) -> SpeechOutcome {
        let args = (text, voice);
        match &self.synthesizer {
            None => match self.memo.lookup(MEMO_NAME, &args).await {
                Some(value) => match decode_audio(value) {
                    Some((audio, mime)) => SpeechOutcome::Ok { audio, mime },
                    None => SpeechOutcome::Disabled,
                },
                None => {
                    info!("speech synthesis disabled and no cached audio for this request");
                    SpeechOutcome::Disabled
                }
            },
            Some(synthesizer) => {
                let result = self
                    .memo
                    .call(MEMO_NAME, &args, || async {
                        let out = synthesizer.synthesize(text, voice).await?;
                        Ok(CacheValue::Tuple(vec![
                            CacheValue::Bytes(out.audio),
                            CacheValue::Text(out.mime),
                        ]))
                    })
                    .await;
                match result {
                    Ok(value) => match decode_audio(value) {
                        Some((audio, mime)) => SpeechOutcome::Ok { audio, mime },
                        None => SpeechOutcome::Failed("cached audio entry is malformed".to_string()),
                    },
                    Err(e) => {
                        error!("speech synthesis failed: {e}; continuing without audio");
                        SpeechOutcome::Failed(e.to_string())
                    }
                }
            }
        }
    }
}

fn decode_audio(value: CacheValue) -> Option<(Vec<u8>, String)> {
    match value {
        CacheValue::Tuple(items) | CacheValue::List(items) => {
            let mut iter = items.into_iter();
            let audio = match iter.next()? {
                CacheValue::Bytes(data) => data,
                _ => return None,
            };
            let mime = match iter.next()? {
                CacheValue::Text(mime) => mime,
                _ => return None,
            };
            Some((audio, mime))
        }
        _ => None,
    }
}
