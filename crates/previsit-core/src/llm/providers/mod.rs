//! Concrete text-generation providers

pub mod chat_completions;
pub mod gemini;

pub use chat_completions::ChatCompletionsProvider;
pub use gemini::GeminiProvider;
