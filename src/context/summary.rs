use std::time::Duration;

use tracing::warn;

use crate::error::GenerationError;
use crate::generate::Generator;
use crate::types::{ContextEntry, Message, Role};

/// Rough character bound requested from the model, and the exact tail
/// length of the degraded fallback.
pub const DIGEST_CHAR_BOUND: usize = 100;

const SUMMARY_INSTRUCTIONS: &str = "You are a conversation summarizer. Condense the \
dialogue into one short digest of at most 100 characters. Preserve key facts and the \
emotional tone. Reply with the digest only.";

/// Format an ordered message slice the way the summarizer sees it:
/// one `"<RoleLabel>: <content>"` line per message.
pub fn format_history(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role.label(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Condense an older message slice into a short digest.
///
/// Never fails: any generation error (including timeout) resolves to the
/// deterministic fallback, so summarization can never block message flow.
pub async fn digest(
    generator: &dyn Generator,
    messages: &[Message],
    personality_hint: &str,
    timeout: Duration,
) -> String {
    if messages.is_empty() {
        return String::new();
    }

    let history = format_history(messages);

    let mut instructions = SUMMARY_INSTRUCTIONS.to_string();
    if !personality_hint.is_empty() {
        instructions.push_str("\nWrite the digest in this voice: ");
        instructions.push_str(personality_hint);
    }

    let request = vec![ContextEntry::new(
        Role::User,
        format!("Summarize this conversation:\n\n{history}"),
    )];

    let call = generator.generate(&instructions, &request, 0.3, 150);
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            warn!("summarizer fell back to truncated history: {e}");
            fallback_digest(&history)
        }
        Err(_) => {
            let e = GenerationError::Timeout(timeout.as_secs());
            warn!("summarizer fell back to truncated history: {e}");
            fallback_digest(&history)
        }
    }
}

/// Degraded digest: the last `DIGEST_CHAR_BOUND` characters of the
/// formatted history. Deterministic and cut on char boundaries.
pub fn fallback_digest(formatted_history: &str) -> String {
    tail_chars(formatted_history, DIGEST_CHAR_BOUND)
}

fn tail_chars(s: &str, n: usize) -> String {
    let total = s.chars().count();
    if total <= n {
        return s.to_string();
    }
    s.chars().skip(total - n).collect()
}
