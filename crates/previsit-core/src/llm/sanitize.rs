//! Cleanup of raw model output
//!
//! Generated text may embed reasoning spans between `<unused94>` and
//! `<unused95>` sentinels, and reports sometimes arrive wrapped in a
//! markdown code fence. Both are stripped before display, speech
//! synthesis, and history append.

use regex::Regex;
use std::sync::LazyLock;

static THINKING_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<unused94>.*?(?:</unused95>|<unused95>)").expect("valid regex"));

static FENCED_REPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?si)^\s*```(?:markdown)?\s*(.*?)\s*```\s*$").expect("valid regex")
});

/// Remove embedded reasoning spans from generated text.
pub fn strip_thinking_blocks(text: &str) -> String {
    THINKING_BLOCK.replace_all(text, "").trim().to_string()
}

/// Extract the first reasoning span, if any, without altering the text.
pub fn extract_thinking_block(text: &str) -> Option<String> {
    static INNER: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)<unused94>(.+?)(?:</unused95>|<unused95>)").expect("valid regex")
    });
    INNER
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Unwrap a report that arrived wholly inside a markdown code fence.
pub fn unwrap_markdown_fence(text: &str) -> String {
    match FENCED_REPORT.captures(text) {
        Some(captures) => captures
            .get(1)
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| text.trim().to_string()),
        None => text.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_thinking_spans() {
        let raw = "<unused94>weighing differentials<unused95>What brings you in today?";
        assert_eq!(strip_thinking_blocks(raw), "What brings you in today?");
    }

    #[test]
    fn extracts_thinking_span() {
        let raw = "<unused94> plan the interview <unused95>Hello";
        assert_eq!(extract_thinking_block(raw).as_deref(), Some("plan the interview"));
        assert_eq!(extract_thinking_block("no span here"), None);
    }

    #[test]
    fn unwraps_fenced_report() {
        let fenced = "```markdown\n# Report\n\nBody text.\n```";
        assert_eq!(unwrap_markdown_fence(fenced), "# Report\n\nBody text.");
    }

    #[test]
    fn leaves_partial_fences_alone() {
        let partial = "# Report\n\n```\ncode sample\n```\ntrailing prose";
        assert_eq!(unwrap_markdown_fence(partial), partial);
    }
}
