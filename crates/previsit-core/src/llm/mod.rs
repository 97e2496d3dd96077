//! Text-generation collaborators
//!
//! The interview core consumes text generation through the [`TextGenerator`]
//! trait; concrete providers are thin HTTP transports and the
//! [`CachedTextGenerator`] adapter routes every call through the persistent
//! cache.

pub mod client;
pub mod messages;
pub mod providers;
pub mod sanitize;

pub use client::{CachedTextGenerator, GenerationParams, TextGenerator};
pub use messages::{ChatMessage, MessageRole};
pub use providers::{ChatCompletionsProvider, GeminiProvider};
pub use sanitize::{extract_thinking_block, strip_thinking_blocks, unwrap_markdown_fence};
