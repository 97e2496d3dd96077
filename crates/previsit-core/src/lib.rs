//! Previsit Core Library
//!
//! Simulates multi-turn clinical pre-visit interviews between an AI
//! interviewer and an AI-roleplayed patient, incrementally building a
//! structured intake report. Every expensive model call is routed through
//! a persistent content-addressed cache so repeated or resumed sessions
//! are cheap and deterministic.

pub mod cache;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod interview;
pub mod llm;
pub mod report;
pub mod speech;

// Re-export commonly used types
pub use cache::{Bucket, CacheStats, CacheValue, Memoizer, PersistentCache, derive_key};
pub use config::{AppConfig, InterviewSettings, ProviderKind};
pub use error::{CoreError, CoreResult};
pub use interview::{InterviewSession, PatientProfile, SessionManager, SessionState, TurnOutput};
pub use llm::{CachedTextGenerator, ChatMessage, GenerationParams, MessageRole, TextGenerator};
pub use report::ReportWriter;
pub use speech::{CachedSpeech, SpeechOutcome, SpeechSynthesizer, SynthesizedAudio};
