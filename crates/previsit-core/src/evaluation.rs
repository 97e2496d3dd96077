//! Post-hoc report evaluation
//!
//! Scores a finished pre-visit report against the condition the patient
//! was de facto diagnosed with: which facts in the report would help a
//! PCP reach that diagnosis, and which helpful facts are missing.

use crate::error::CoreResult;
use crate::interview::prompts::evaluation_instructions;
use crate::llm::sanitize::strip_thinking_blocks;
use crate::llm::{ChatMessage, GenerationParams, TextGenerator};

/// Evaluate `report` against the de-facto diagnosed `condition`.
pub async fn evaluate_report(
    generator: &dyn TextGenerator,
    report: &str,
    condition: &str,
    params: &GenerationParams,
) -> CoreResult<String> {
    let messages = vec![
        ChatMessage::system(evaluation_instructions(condition)),
        ChatMessage::user(format!("Here is the report text:\n{report}")),
    ];
    let raw = generator.complete(&messages, params).await?;
    Ok(strip_thinking_blocks(&raw))
}
